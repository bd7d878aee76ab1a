//! Mock actions and conversational fallback for testing

use anyhow::Result;
use async_trait::async_trait;
use hark::commands::{Action, ActionContext};
use hark::core::Conversation;
use std::sync::{Arc, Mutex};

/// Appends `action:<phrase>` to a shared event log
pub struct RecordingAction {
    pub events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Action for RecordingAction {
    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("action:{}", ctx.phrase));
        Ok(())
    }

    fn describe(&self) -> String {
        "record".to_string()
    }
}

/// Always fails, after recording the attempt
pub struct FailingAction {
    pub events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Action for FailingAction {
    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("failed:{}", ctx.phrase));
        anyhow::bail!("mock action failure")
    }
}

/// Records requests and answers with a canned reply
#[derive(Default)]
pub struct MockConversation {
    /// `(session_id, text)` pairs received
    pub requests: Mutex<Vec<(String, String)>>,
    pub reply: String,
    pub should_fail: bool,
}

impl MockConversation {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Conversation for MockConversation {
    async fn reply(&self, session_id: &str, text: &str) -> Result<String> {
        self.requests
            .lock()
            .unwrap()
            .push((session_id.to_string(), text.to_string()));
        if self.should_fail {
            anyhow::bail!("connection refused");
        }
        Ok(self.reply.clone())
    }
}
