//! External player process (mpv by default)

use super::{PlaybackHandle, Player};
use crate::error::{AgentError, AgentResult};
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ProcessPlayer {
    program: String,
    args: Vec<String>,
}

impl ProcessPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for ProcessPlayer {
    fn default() -> Self {
        Self::new("mpv", vec!["--volume=100".to_string()])
    }
}

impl Player for ProcessPlayer {
    /// Must be called from within the tokio runtime
    fn launch(&self, artifact: &Path) -> AgentResult<Box<dyn PlaybackHandle>> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(artifact)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AgentError::PlaybackLaunchFailed(format!("{} {}: {}", self.program, artifact.display(), e))
            })?;

        debug!("🔊 {} playing {} (pid {:?})", self.program, artifact.display(), child.id());
        Ok(Box::new(ChildPlayback { child, done: false }))
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// A spawned player; the runtime reaps it once killed
#[derive(Debug)]
struct ChildPlayback {
    child: Child,
    done: bool,
}

impl PlaybackHandle for ChildPlayback {
    fn is_running(&mut self) -> bool {
        if self.done {
            return false;
        }
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => {
                self.done = true;
                false
            }
            Err(e) => {
                warn!("Failed to poll player process: {}", e);
                false
            }
        }
    }

    fn terminate(&mut self) {
        if self.done {
            return;
        }
        // Never blocks: the kill is sent and exit status collected if ready
        if let Err(e) = self.child.start_kill() {
            debug!("Player already exited: {}", e);
        }
        let _ = self.child.try_wait();
        self.done = true;
    }
}

impl Drop for ChildPlayback {
    fn drop(&mut self) {
        self.terminate();
    }
}
