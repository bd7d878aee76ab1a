//! Core processing modules
//!
//! Contains intent matching, text normalization and the conversational
//! fallback.

pub mod history;
pub mod intent;
pub mod ollama;
pub mod text_normalizer;

use anyhow::Result;
use async_trait::async_trait;

pub use history::{ChatHistory, ChatMessage};
pub use intent::{IntentMatcher, MatchThresholds, PhraseCatalog, PhraseMatch, PhraseSet};
pub use ollama::OllamaChat;

/// Free-text fallback for utterances that match no command
#[async_trait]
pub trait Conversation: Send + Sync {
    /// Reply to `text` within the conversation `session_id`
    async fn reply(&self, session_id: &str, text: &str) -> Result<String>;

    /// Condense `text` (a selection, a command's output) into one sentence
    async fn summarize(&self, text: &str) -> Result<String> {
        self.reply(SUMMARY_SESSION, &summary_request(text)).await
    }
}

/// Session used by summaries so they stay out of the chat history
pub const SUMMARY_SESSION: &str = "summary";

pub(crate) fn summary_request(text: &str) -> String {
    format!("Summarize the following text:\n\n{}", text)
}
