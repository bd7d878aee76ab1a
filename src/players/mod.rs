//! Playback boundary: launch a player against a rendered artifact

pub mod process;

use crate::error::AgentResult;
use std::path::Path;

pub use process::ProcessPlayer;

/// A running playback
pub trait PlaybackHandle: Send + std::fmt::Debug {
    /// True until the player has exited
    fn is_running(&mut self) -> bool;

    /// Stop playback and reap the player; safe to call after exit
    fn terminate(&mut self);
}

pub trait Player: Send + Sync + std::fmt::Debug {
    /// Start playing `artifact` in the background and return at once
    fn launch(&self, artifact: &Path) -> AgentResult<Box<dyn PlaybackHandle>>;

    /// Player name for logs
    fn name(&self) -> &str;
}
