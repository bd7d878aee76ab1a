//! Network microphone: raw PCM datagrams over UDP
//!
//! Each datagram becomes one [`AudioFrame`]; the sender is expected to stream
//! 16 kHz mono s16le, the same format the local microphone produces.

use super::{AudioFrame, FrameQueue, PushOutcome};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Largest datagram accepted as a frame
const MAX_DATAGRAM: usize = 4096;

pub struct UdpFrameSource {
    socket: UdpSocket,
}

impl UdpFrameSource {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Forward datagrams into `queue` until `cancel` fires
    pub fn spawn(self, queue: Arc<FrameQueue>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Ok(addr) = self.socket.local_addr() {
                info!("🎙️ Listening for audio stream on udp://{}", addr);
            }
            let mut buf = vec![0u8; MAX_DATAGRAM];

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    received = self.socket.recv_from(&mut buf) => {
                        match received {
                            Ok((0, _)) => continue,
                            Ok((len, peer)) => {
                                let frame = AudioFrame::new(buf[..len].to_vec());
                                if queue.push(frame) == PushOutcome::Closed {
                                    debug!("Frame queue closed, stopping stream from {}", peer);
                                    break;
                                }
                            }
                            Err(e) => warn!("Audio stream receive error: {}", e),
                        }
                    }
                }
            }

            info!("🎙️ Audio stream listener stopped");
        })
    }
}
