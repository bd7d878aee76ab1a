//! Command Processor
//!
//! The orchestration loop: one consumer arbitrating between the control
//! channel and the frame queue, driving the wake/command state machine.
//!
//! Per final utterance, in priority order:
//! 1. Interrupt phrase while speech is playing → stop playback, back to idle
//! 2. Command window open → match the command catalog, dispatch or fall back
//! 3. Idle → look for a wake phrase and open the command window

use crate::asr::Recognizer;
use crate::audio::{AudioFrame, FrameQueue};
use crate::commands::{self, ActionContext, CommandRegistry};
use crate::config::Config;
use crate::core::text_normalizer::{clean_reply, normalize_utterance};
use crate::core::{Conversation, IntentMatcher, PhraseSet};
use crate::error::{AgentError, AgentResult};
use crate::ipc::ControlMessage;
use crate::playback::PlaybackController;
use rand::seq::SliceRandom;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Wake/command state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingCommand,
}

/// Result of processing an utterance or control message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// Nothing to do (blank text, or no wake word while idle)
    Ignored,
    /// Playback was stopped by an interrupt phrase
    Interrupted,
    /// Command window opened
    Woke,
    /// Matched phrase whose action ran
    Dispatched(String),
    /// Matched phrase whose action failed
    ActionFailed(String),
    /// Text handed to the conversational fallback
    FellBack(String),
    /// No match and no fallback configured
    NotUnderstood,
}

pub struct Processor {
    matcher: IntentMatcher,
    registry: CommandRegistry,
    voice: Arc<PlaybackController>,
    recognizer: Box<dyn Recognizer>,
    conversation: Option<Arc<dyn Conversation>>,
    session_id: String,
    wake_responses: Vec<String>,
    dont_understand_responses: Vec<String>,
    /// `None` keeps the command window open until the next utterance
    command_timeout: Option<Duration>,
    state: SessionState,
    window_opened: Option<Instant>,
}

impl Processor {
    pub fn new(
        config: &Config,
        recognizer: Box<dyn Recognizer>,
        registry: CommandRegistry,
        voice: Arc<PlaybackController>,
    ) -> Self {
        let matcher = IntentMatcher::new(
            config.thresholds,
            PhraseSet::new(&config.wake_words),
            PhraseSet::new(&config.interrupt_words),
        );

        Self {
            matcher,
            registry,
            voice,
            recognizer,
            conversation: None,
            session_id: config.session_id.clone(),
            wake_responses: config.wake_responses.clone(),
            dont_understand_responses: config.dont_understand_responses.clone(),
            command_timeout: (config.command_timeout > 0)
                .then(|| Duration::from_secs(config.command_timeout)),
            state: SessionState::Idle,
            window_opened: None,
        }
    }

    /// Route unmatched commands to `conversation`
    pub fn with_conversation(mut self, conversation: Arc<dyn Conversation>) -> Self {
        self.conversation = Some(conversation);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn voice(&self) -> &Arc<PlaybackController> {
        &self.voice
    }

    /// Speak the startup line, best-effort
    pub fn greet(&self, greeting: &str) -> impl Future<Output = ()> + Send + 'static {
        let voice = self.voice.clone();
        let greeting = greeting.to_string();
        async move { say(&voice, &greeting).await }
    }

    /// Feed one frame to the recognizer and handle any final utterance
    pub async fn handle_frame(&mut self, frame: &AudioFrame) -> Option<ProcessResult> {
        match self.recognizer.accept_frame(frame).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("⚠️ {} recognizer: {}", self.recognizer.name(), e);
                return None;
            }
        }

        let utterance = self.recognizer.take_result();
        if !utterance.is_final {
            debug!("Partial: {}", utterance.text);
            return None;
        }
        Some(self.handle_utterance(&utterance.text).await)
    }

    /// Drive the state machine with one final utterance
    pub async fn handle_utterance(&mut self, text: &str) -> ProcessResult {
        // A late final (backlog, slow transcription) must not land in a stale window
        self.expire_command_window();

        let Some(text) = normalize_utterance(text) else {
            return ProcessResult::Ignored;
        };
        info!("📝 Heard: '{}'", text);

        if self.matcher.is_interrupt(&text) && self.voice.is_active().await {
            self.voice.cancel().await;
            self.recognizer.reset();
            self.close_window();
            info!("🤫 Interrupted playback");
            return ProcessResult::Interrupted;
        }

        match self.state {
            SessionState::AwaitingCommand => {
                self.close_window();
                self.run_command(&text).await
            }
            SessionState::Idle => {
                if self.matcher.is_wake(&text) {
                    self.wake().await;
                    ProcessResult::Woke
                } else {
                    debug!("No wake word in '{}'", text);
                    ProcessResult::Ignored
                }
            }
        }
    }

    /// Handle one remote control message
    pub async fn handle_control(&mut self, message: ControlMessage) -> ProcessResult {
        match message {
            ControlMessage::Wake => {
                info!("📨 Remote wake");
                // Audio buffered before the remote wake is not the command
                self.recognizer.reset();
                self.wake().await;
                ProcessResult::Woke
            }
            ControlMessage::RunCommand(text) => {
                let Some(text) = normalize_utterance(&text) else {
                    return ProcessResult::Ignored;
                };
                info!("📨 Remote command: '{}'", text);
                self.run_command(&text).await
            }
        }
    }

    /// Close the command window if it has been open too long
    pub fn expire_command_window(&mut self) -> bool {
        match self.window_deadline() {
            Some(deadline) if Instant::now() >= deadline => {
                info!("⌛ No command heard, going back to sleep");
                self.close_window();
                true
            }
            _ => false,
        }
    }

    /// Run until `cancel` fires or the frame source closes
    ///
    /// A pending control message is always handled before the next frame.
    pub async fn run(
        &mut self,
        frames: Arc<FrameQueue>,
        mut control: UnboundedReceiver<ControlMessage>,
        cancel: CancellationToken,
    ) -> AgentResult<()> {
        info!(
            "✅ Listening (recognizer: {}, thresholds: {:?})",
            self.recognizer.name(),
            self.matcher.thresholds()
        );
        let mut control_open = true;

        loop {
            let deadline = self.window_deadline();
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("🛑 Shutdown requested");
                    break;
                }
                message = control.recv(), if control_open => match message {
                    Some(message) => {
                        let result = self.handle_control(message).await;
                        debug!("Control result: {:?}", result);
                    }
                    None => {
                        debug!("Control channel closed");
                        control_open = false;
                    }
                },
                frame = frames.pop() => match frame {
                    Some(frame) => {
                        if let Some(result) = self.handle_frame(&frame).await {
                            debug!("Utterance result: {:?}", result);
                        }
                    }
                    None => {
                        info!("🎙️ Frame source closed");
                        break;
                    }
                },
                () = window_expiry(deadline) => {
                    self.expire_command_window();
                }
            }
        }

        self.voice.shutdown().await;
        frames.close();
        control.close();
        info!("👋 Processor stopped");
        Ok(())
    }

    async fn wake(&mut self) {
        self.state = SessionState::AwaitingCommand;
        self.window_opened = Some(Instant::now());
        info!("👂 Awake, waiting for a command");
        let response = self.wake_responses.choose(&mut rand::thread_rng()).cloned();
        if let Some(response) = response {
            say(&self.voice, &response).await;
        }
    }

    async fn run_command(&mut self, text: &str) -> ProcessResult {
        let matched = self
            .matcher
            .resolve(text, self.registry.catalog())
            .map(|m| (m.phrase.to_string(), m.value.clone(), m.score));

        let Some((phrase, action, score)) = matched else {
            return self.fall_back(text).await;
        };

        info!("🎯 Matched '{}' → '{}' ({:.0})", text, phrase, score);
        let ctx = ActionContext {
            voice: self.voice.clone(),
            phrase: phrase.clone(),
            utterance: text.to_string(),
            conversation: self.conversation.clone(),
        };
        match commands::dispatch(action.as_ref(), &ctx).await {
            Ok(()) => ProcessResult::Dispatched(phrase),
            Err(e) => {
                warn!("❌ {}", e);
                ProcessResult::ActionFailed(phrase)
            }
        }
    }

    async fn fall_back(&mut self, text: &str) -> ProcessResult {
        let Some(conversation) = &self.conversation else {
            info!("🤷 No command matches '{}'", text);
            let response = self
                .dont_understand_responses
                .choose(&mut rand::thread_rng())
                .cloned();
            if let Some(response) = response {
                say(&self.voice, &response).await;
            }
            return ProcessResult::NotUnderstood;
        };

        info!("🧠 Asking the assistant: '{}'", text);
        match conversation.reply(&self.session_id, text).await {
            Ok(reply) => {
                let reply = clean_reply(&reply);
                info!("💬 Reply: '{}'", reply);
                say(&self.voice, &reply).await;
            }
            Err(e) => warn!("⚠️ {}", AgentError::ConversationUnavailable(format!("{:#}", e))),
        }
        ProcessResult::FellBack(text.to_string())
    }

    fn close_window(&mut self) {
        self.state = SessionState::Idle;
        self.window_opened = None;
    }

    fn window_deadline(&self) -> Option<Instant> {
        match (self.state, self.window_opened, self.command_timeout) {
            (SessionState::AwaitingCommand, Some(opened), Some(timeout)) => Some(opened + timeout),
            _ => None,
        }
    }
}

/// Speak best-effort; speech failures are logged and never fail the caller
async fn say(voice: &PlaybackController, text: &str) {
    if let Err(e) = voice.speak(text).await {
        warn!("⚠️ {}", e);
    }
}

async fn window_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
