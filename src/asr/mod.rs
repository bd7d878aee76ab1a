//! ASR (Automatic Speech Recognition) Module
//!
//! The recognizer is an external collaborator: the agent feeds it frames and
//! collects finished utterances. Backends:
//! - Wyoming: remote ASR protocol (e.g., faster-whisper), endpointed locally
//! - Vosk: local offline recognition (`vosk` feature)

#[cfg(feature = "vosk")]
pub mod vosk;
pub mod wyoming;

use crate::audio::AudioFrame;
use crate::config::Config;
use crate::error::{AgentError, AgentResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

pub use wyoming::{Endpointer, WyomingClient, WyomingRecognizer};

/// One unit of recognized speech
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub is_final: bool,
}

impl Utterance {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// Streaming recognition boundary
///
/// State carries across calls; one recognizer lives for the whole process.
#[async_trait]
pub trait Recognizer: Send {
    /// Feed one frame; `true` when a result is ready for [`take_result`]
    ///
    /// [`take_result`]: Recognizer::take_result
    async fn accept_frame(&mut self, frame: &AudioFrame) -> AgentResult<bool>;

    /// Take the pending result, leaving an empty partial behind
    fn take_result(&mut self) -> Utterance;

    /// Drop any buffered audio and partial hypothesis
    fn reset(&mut self);

    /// Engine name for logs
    fn name(&self) -> &str;
}

/// Factory to create the configured recognizer
///
/// Failure here is fatal: the agent cannot run without a recognizer.
pub async fn create_engine(config: &Config) -> AgentResult<Box<dyn Recognizer>> {
    info!("🛠️ Creating recognizer: {}", config.asr_engine);
    match config.asr_engine.as_str() {
        "wyoming" => {
            let client = WyomingClient::new(&config.wyoming_host, config.wyoming_port)
                .with_sample_rate(config.sample_rate)
                .with_timeout(Duration::from_secs(config.wyoming_timeout_secs));
            if !client.health_check().await {
                return Err(AgentError::RecognizerUnavailable(format!(
                    "no Wyoming server at {}:{}",
                    config.wyoming_host, config.wyoming_port
                )));
            }
            let endpointer = Endpointer::new(
                config.sample_rate,
                config.vad_energy_threshold,
                Duration::from_millis(config.vad_silence_ms),
                Duration::from_millis(config.max_utterance_ms),
            );
            Ok(Box::new(WyomingRecognizer::new(client, endpointer)))
        }
        #[cfg(feature = "vosk")]
        "vosk" => Ok(Box::new(vosk::VoskRecognizer::new(config)?)),
        other => Err(AgentError::RecognizerUnavailable(format!(
            "unknown or disabled recognizer '{}'",
            other
        ))),
    }
}
