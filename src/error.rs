//! Hark Error Types
//!
//! Centralized error handling for the voice pipeline. Only
//! [`AgentError::RecognizerUnavailable`] is fatal; everything else is
//! logged by the orchestration loop and the agent keeps listening.

use thiserror::Error;

/// Central error type for Hark
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Recognition stream error: {0}")]
    RecognitionStream(String),

    #[error("Recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    #[error("Speech synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    #[error("Playback launch failed: {0}")]
    PlaybackLaunchFailed(String),

    #[error("Action for '{phrase}' failed: {reason}")]
    ActionFailed { phrase: String, reason: String },

    #[error("Control channel error: {0}")]
    ControlChannel(String),

    #[error("Conversation fallback unavailable: {0}")]
    ConversationUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Hark operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for AgentError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        AgentError::Lock(err.to_string())
    }
}

impl AgentError {
    /// Whether this error should stop the agent before the loop starts
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::RecognizerUnavailable(_))
    }
}
