//! Control message wire format
//!
//! Newline-free UTF-8 datagrams: `WAKE`, or `CMD:<text>` where the text is
//! everything after the first colon.

use crate::error::{AgentError, AgentResult};
use std::fmt;
use std::str::FromStr;

/// Largest datagram accepted as a control message
pub const MAX_CONTROL_DATAGRAM: usize = 512;

const WAKE: &str = "WAKE";
const COMMAND_PREFIX: &str = "CMD:";

/// Out-of-band instruction from a remote sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Open the command window as if the wake word was heard
    Wake,
    /// Run this text against the command catalog, no wake word needed
    RunCommand(String),
}

impl ControlMessage {
    /// Decode one datagram
    pub fn parse(datagram: &[u8]) -> AgentResult<Self> {
        if datagram.len() > MAX_CONTROL_DATAGRAM {
            return Err(AgentError::ControlChannel(format!(
                "datagram of {} bytes exceeds {}",
                datagram.len(),
                MAX_CONTROL_DATAGRAM
            )));
        }
        let text = std::str::from_utf8(datagram)
            .map_err(|e| AgentError::ControlChannel(format!("not UTF-8: {}", e)))?;
        text.parse()
    }
}

impl FromStr for ControlMessage {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_end_matches(['\r', '\n']);
        if s == WAKE {
            return Ok(ControlMessage::Wake);
        }
        if let Some(text) = s.strip_prefix(COMMAND_PREFIX) {
            return Ok(ControlMessage::RunCommand(text.to_string()));
        }
        let preview: String = s.chars().take(32).collect();
        Err(AgentError::ControlChannel(format!(
            "unrecognized message '{}'",
            preview
        )))
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMessage::Wake => f.write_str(WAKE),
            ControlMessage::RunCommand(text) => write!(f, "{}{}", COMMAND_PREFIX, text),
        }
    }
}
