//! IPC (Inter-Process Communication) Module
//!
//! Remote control channel: UDP datagrams carrying `WAKE` or `CMD:<text>`.

pub mod client;
pub mod messages;
pub mod server;

pub use client::ControlClient;
pub use messages::{ControlMessage, MAX_CONTROL_DATAGRAM};
pub use server::ControlServer;
