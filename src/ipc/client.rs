//! Control Client
//!
//! Sends control messages to a running agent.

use super::ControlMessage;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::debug;

pub struct ControlClient {
    socket: UdpSocket,
    target: SocketAddr,
}

impl ControlClient {
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind)
            .await
            .context("Failed to bind control client socket")?;
        Ok(Self { socket, target })
    }

    pub async fn send(&self, message: &ControlMessage) -> Result<()> {
        let wire = message.to_string();
        self.socket
            .send_to(wire.as_bytes(), self.target)
            .await
            .with_context(|| format!("Failed to send control message to {}", self.target))?;
        debug!("📨 Sent '{}' to {}", wire, self.target);
        Ok(())
    }
}
