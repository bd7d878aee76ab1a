//! Mock Recognizer for Testing
//!
//! Reads each frame's bytes as the "recognized" text, so a test scripts the
//! recognizer by choosing what to push into the frame queue:
//! - `PARTIAL:<text>` yields a partial result
//! - `ERROR` makes the recognizer fail on that frame
//! - an empty frame yields nothing
//! - anything else is a final utterance

use async_trait::async_trait;
use hark::asr::{Recognizer, Utterance};
use hark::audio::AudioFrame;
use hark::error::{AgentError, AgentResult};
use std::sync::{Arc, Mutex};

pub struct MockRecognizer {
    pending: Option<Utterance>,
    /// Shared event log; every fed frame appends `frame:<text>`
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockRecognizer {
    pub fn new(events: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            pending: None,
            events,
        }
    }
}

/// Frame carrying `text` for the mock recognizer
pub fn text_frame(text: &str) -> AudioFrame {
    AudioFrame::new(text.as_bytes().to_vec())
}

#[async_trait]
impl Recognizer for MockRecognizer {
    async fn accept_frame(&mut self, frame: &AudioFrame) -> AgentResult<bool> {
        let text = String::from_utf8_lossy(frame.as_bytes()).to_string();
        self.events.lock().unwrap().push(format!("frame:{}", text));

        if text.is_empty() {
            return Ok(false);
        }
        if text == "ERROR" {
            return Err(AgentError::RecognitionStream("mock failure".to_string()));
        }
        self.pending = Some(match text.strip_prefix("PARTIAL:") {
            Some(partial) => Utterance::partial(partial),
            None => Utterance::final_text(text),
        });
        Ok(true)
    }

    fn take_result(&mut self) -> Utterance {
        self.pending.take().unwrap_or_default()
    }

    fn reset(&mut self) {
        self.pending = None;
    }

    fn name(&self) -> &str {
        "mock"
    }
}
