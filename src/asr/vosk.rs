//! ASR (Automatic Speech Recognition) module using Vosk

use super::{Recognizer, Utterance};
use crate::audio::AudioFrame;
use crate::config::Config;
use crate::error::{AgentError, AgentResult};
use async_trait::async_trait;
use tracing::{debug, info};
use vosk::{Model, Recognizer as KaldiRecognizer};

/// Vosk-based streaming recognizer
pub struct VoskRecognizer {
    recognizer: KaldiRecognizer,
    pending: Option<Utterance>,
}

impl VoskRecognizer {
    /// Load the model and create a recognizer
    pub fn new(config: &Config) -> AgentResult<Self> {
        let model_path = std::path::PathBuf::from(&config.vosk_model_path);

        if !model_path.exists() {
            return Err(AgentError::RecognizerUnavailable(format!(
                "Vosk model not found at {}",
                model_path.display()
            )));
        }

        info!("Loading Vosk model from: {}", model_path.display());

        let model_str = model_path.to_str().ok_or_else(|| {
            AgentError::RecognizerUnavailable(format!(
                "Vosk model path is not valid UTF-8: {}",
                model_path.display()
            ))
        })?;

        let model = Model::new(model_str).ok_or_else(|| {
            AgentError::RecognizerUnavailable("Failed to load Vosk model".to_string())
        })?;

        let mut recognizer = KaldiRecognizer::new(&model, config.sample_rate as f32)
            .ok_or_else(|| {
                AgentError::RecognizerUnavailable("Failed to create Vosk recognizer".to_string())
            })?;
        recognizer.set_words(true);

        Ok(Self {
            recognizer,
            pending: None,
        })
    }
}

#[async_trait]
impl Recognizer for VoskRecognizer {
    async fn accept_frame(&mut self, frame: &AudioFrame) -> AgentResult<bool> {
        let samples = frame.samples();

        match self.recognizer.accept_waveform(&samples) {
            vosk::DecodingState::Finalized => {
                let result = self.recognizer.result();
                let text = result
                    .single()
                    .map(|single| single.text.trim().to_string())
                    .unwrap_or_default();
                self.pending = Some(Utterance::final_text(text));
                Ok(true)
            }
            vosk::DecodingState::Running => {
                // Partial result - could log for debugging
                debug!("Partial: {}", self.recognizer.partial_result().partial);
                Ok(false)
            }
            vosk::DecodingState::Failed => Err(AgentError::RecognitionStream(
                "Vosk decoding failed for this frame".to_string(),
            )),
        }
    }

    fn take_result(&mut self) -> Utterance {
        self.pending.take().unwrap_or_default()
    }

    fn reset(&mut self) {
        self.recognizer.reset();
        self.pending = None;
    }

    fn name(&self) -> &str {
        "vosk"
    }
}
