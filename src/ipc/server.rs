//! Control Server
//!
//! UDP listener feeding decoded control messages to the orchestration loop.

use super::{ControlMessage, MAX_CONTROL_DATAGRAM};
use crate::audit::AuditLog;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ControlServer {
    socket: UdpSocket,
    audit: Option<Arc<AuditLog>>,
}

impl ControlServer {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket,
            audit: None,
        })
    }

    /// Record every accepted message in `audit`
    pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Decode datagrams into `tx` in arrival order until `cancel` fires
    pub fn spawn(
        self,
        tx: UnboundedSender<ControlMessage>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Ok(addr) = self.socket.local_addr() {
                info!("🔌 Control channel listening on udp://{}", addr);
            }
            // One spare byte detects oversized datagrams
            let mut buf = vec![0u8; MAX_CONTROL_DATAGRAM + 1];

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    received = self.socket.recv_from(&mut buf) => {
                        let (len, peer) = match received {
                            Ok(received) => received,
                            Err(e) => {
                                warn!("Control channel receive error: {}", e);
                                continue;
                            }
                        };

                        let message = match ControlMessage::parse(&buf[..len]) {
                            Ok(message) => message,
                            Err(e) => {
                                warn!("⚠️ Dropped control datagram from {}: {}", peer, e);
                                continue;
                            }
                        };

                        debug!("📨 Control message from {}: {}", peer, message);
                        self.audit_message(&message);

                        if tx.send(message).is_err() {
                            debug!("Control receiver dropped, stopping listener");
                            break;
                        }
                    }
                }
            }

            info!("🔌 Control channel stopped");
        })
    }

    fn audit_message(&self, message: &ControlMessage) {
        let Some(audit) = &self.audit else {
            return;
        };
        let entry = match message {
            ControlMessage::Wake => "Remote wake".to_string(),
            ControlMessage::RunCommand(text) => format!("Remote command: {}", text),
        };
        if let Err(e) = audit.record(&entry) {
            warn!("⚠️ Failed to write audit log: {}", e);
        }
    }
}
