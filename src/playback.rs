//! Playback controller: one spoken line at a time, interruptible
//!
//! All state sits behind a single async mutex, so a cancel can never
//! interleave with a starting session and leave two players alive.

use crate::error::{AgentError, AgentResult};
use crate::players::{PlaybackHandle, Player};
use crate::tts::Synthesizer;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug)]
struct PlaybackSession {
    text: String,
    artifact: PathBuf,
    handle: Box<dyn PlaybackHandle>,
}

#[derive(Debug)]
struct Inner {
    synthesizer: Option<Box<dyn Synthesizer>>,
    player: Box<dyn Player>,
    session: Option<PlaybackSession>,
}

impl Inner {
    /// Terminate the current session; true if a player was still running
    fn stop_session(&mut self) -> bool {
        match self.session.take() {
            Some(mut session) => {
                let was_running = session.handle.is_running();
                session.handle.terminate();
                if was_running {
                    debug!("🔇 Stopped playback of '{}'", session.text);
                }
                was_running
            }
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct PlaybackController {
    inner: Mutex<Inner>,
}

impl PlaybackController {
    /// `synthesizer` is `None` when speech is unavailable; the agent then runs mute
    pub fn new(synthesizer: Option<Box<dyn Synthesizer>>, player: Box<dyn Player>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                synthesizer,
                player,
                session: None,
            }),
        }
    }

    /// Synthesize `text` and start playing it, replacing any current playback
    ///
    /// Returns once the player is launched, not when it finishes.
    pub async fn speak(&self, text: &str) -> AgentResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock().await;
        inner.stop_session();

        let synthesizer = inner.synthesizer.as_mut().ok_or_else(|| {
            AgentError::SynthesisUnavailable("no synthesizer configured".to_string())
        })?;
        let artifact = synthesizer.synthesize(text).await?;

        let handle = inner.player.launch(&artifact)?;
        info!("🗣️ Speaking: '{}'", text);
        inner.session = Some(PlaybackSession {
            text: text.to_string(),
            artifact,
            handle,
        });
        Ok(())
    }

    /// Stop the current playback; a no-op when nothing is playing
    ///
    /// Returns true if a player was actually stopped.
    pub async fn cancel(&self) -> bool {
        self.inner.lock().await.stop_session()
    }

    /// True while a playback process is alive
    pub async fn is_active(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let running = inner
            .session
            .as_mut()
            .map(|session| session.handle.is_running())
            .unwrap_or(false);
        if !running && inner.session.is_some() {
            inner.session = None;
        }
        running
    }

    /// Artifact of the live session, if any
    pub async fn current_artifact(&self) -> Option<PathBuf> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|session| session.artifact.clone())
    }

    pub async fn has_synthesizer(&self) -> bool {
        self.inner.lock().await.synthesizer.is_some()
    }

    /// Stop playback and the synthesizer process
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.stop_session();
        if let Some(synthesizer) = inner.synthesizer.as_mut() {
            synthesizer.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct EchoSynth {
        fail: bool,
    }

    #[async_trait]
    impl Synthesizer for EchoSynth {
        async fn synthesize(&mut self, text: &str) -> AgentResult<PathBuf> {
            if self.fail {
                return Err(AgentError::SynthesisUnavailable("down".into()));
            }
            Ok(PathBuf::from(format!("/tmp/{}.wav", text.replace(' ', "_"))))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[derive(Debug)]
    struct CountingHandle {
        live: Arc<AtomicUsize>,
        running: bool,
    }

    impl PlaybackHandle for CountingHandle {
        fn is_running(&mut self) -> bool {
            self.running
        }

        fn terminate(&mut self) {
            if self.running {
                self.running = false;
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    #[derive(Debug, Default)]
    struct CountingPlayer {
        live: Arc<AtomicUsize>,
        launches: AtomicUsize,
    }

    impl Player for CountingPlayer {
        fn launch(&self, _artifact: &Path) -> AgentResult<Box<dyn PlaybackHandle>> {
            self.live.fetch_add(1, Ordering::SeqCst);
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingHandle {
                live: self.live.clone(),
                running: true,
            }))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn controller(live: Arc<AtomicUsize>) -> PlaybackController {
        PlaybackController::new(
            Some(Box::new(EchoSynth::default())),
            Box::new(CountingPlayer {
                live,
                launches: AtomicUsize::new(0),
            }),
        )
    }

    #[tokio::test]
    async fn test_speak_replaces_previous_session() {
        let live = Arc::new(AtomicUsize::new(0));
        let voice = controller(live.clone());

        for text in ["one", "two", "three"] {
            voice.speak(text).await.expect("speak");
            assert_eq!(live.load(Ordering::SeqCst), 1);
        }
        assert_eq!(
            voice.current_artifact().await,
            Some(PathBuf::from("/tmp/three.wav"))
        );
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let live = Arc::new(AtomicUsize::new(0));
        let voice = controller(live.clone());

        assert!(!voice.cancel().await);
        voice.speak("hello").await.expect("speak");
        assert!(voice.is_active().await);
        assert!(voice.cancel().await);
        assert!(!voice.cancel().await);
        assert!(!voice.is_active().await);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_text_is_noop() {
        let live = Arc::new(AtomicUsize::new(0));
        let voice = controller(live.clone());

        voice.speak("   ").await.expect("noop");
        assert!(!voice.is_active().await);
    }

    #[tokio::test]
    async fn test_mute_agent_reports_unavailable() {
        let voice = PlaybackController::new(None, Box::new(CountingPlayer::default()));
        let err = voice.speak("hello").await.expect_err("mute");
        assert!(matches!(err, AgentError::SynthesisUnavailable(_)));
        assert!(!voice.has_synthesizer().await);
    }

    #[tokio::test]
    async fn test_failed_synthesis_still_stops_old_playback() {
        let live = Arc::new(AtomicUsize::new(0));
        let voice = controller(live.clone());
        voice.speak("first").await.expect("speak");

        voice.inner.lock().await.synthesizer = Some(Box::new(EchoSynth { fail: true }));
        assert!(voice.speak("second").await.is_err());
        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert!(!voice.is_active().await);
    }

    #[tokio::test]
    async fn test_concurrent_speak_and_cancel_keep_one_session() {
        let live = Arc::new(AtomicUsize::new(0));
        let voice = Arc::new(controller(live.clone()));

        let mut tasks = Vec::new();
        for i in 0..20 {
            let voice = voice.clone();
            tasks.push(tokio::spawn(async move {
                if i % 3 == 0 {
                    voice.cancel().await;
                } else {
                    let _ = voice.speak(&format!("line {}", i)).await;
                }
            }));
        }
        for task in tasks {
            task.await.expect("task");
        }
        assert!(live.load(Ordering::SeqCst) <= 1);
    }
}
