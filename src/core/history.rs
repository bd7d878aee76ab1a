//! File-backed chat history, keyed by conversation session id

use crate::error::AgentResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One chat turn in the shape Ollama's chat API expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug)]
pub struct ChatHistory {
    path: PathBuf,
    limit: usize,
    sessions: HashMap<String, Vec<ChatMessage>>,
}

impl ChatHistory {
    /// Load history from `path`; a missing or unreadable file starts empty
    pub fn load(path: &Path, limit: usize) -> Self {
        let sessions = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!("⚠️ Chat history at {} is corrupt, starting fresh: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("⚠️ Failed to read chat history {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            limit,
            sessions,
        }
    }

    pub fn messages(&self, session_id: &str) -> &[ChatMessage] {
        self.sessions
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append a turn, dropping the oldest ones beyond the limit
    pub fn push(&mut self, session_id: &str, message: ChatMessage) {
        let turns = self.sessions.entry(session_id.to_string()).or_default();
        turns.push(message);
        if self.limit > 0 && turns.len() > self.limit {
            let excess = turns.len() - self.limit;
            turns.drain(..excess);
        }
    }

    /// Write the whole store through a temp file and rename
    pub fn save(&self) -> AgentResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&self.sessions)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("💾 Chat history saved to {}", self.path.display());
        Ok(())
    }
}
