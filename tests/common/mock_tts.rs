//! Mock speech and playback for testing
//!
//! Records all spoken text and counts live playback processes.

use async_trait::async_trait;
use hark::error::{AgentError, AgentResult};
use hark::players::{PlaybackHandle, Player};
use hark::tts::Synthesizer;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock synthesizer that records spoken text
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    /// All text that was "spoken"
    pub spoken: Arc<Mutex<Vec<String>>>,
    /// Simulate the engine being down
    pub should_fail: Arc<AtomicBool>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&mut self, text: &str) -> AgentResult<PathBuf> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(AgentError::SynthesisUnavailable("mock engine down".to_string()));
        }
        let mut spoken = self.spoken.lock().unwrap();
        spoken.push(text.to_string());
        Ok(PathBuf::from(format!("/tmp/mock-{}.wav", spoken.len())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Shared view of the mock player's processes
#[derive(Debug, Default, Clone)]
pub struct PlayerProbe {
    pub live: Arc<AtomicUsize>,
    pub max_live: Arc<AtomicUsize>,
    pub launches: Arc<AtomicUsize>,
    handles: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
}

impl PlayerProbe {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Let every running playback finish on its own
    pub fn finish_all(&self) {
        for running in self.handles.lock().unwrap().iter() {
            if running.swap(false, Ordering::SeqCst) {
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MockPlayer {
    pub probe: PlayerProbe,
    pub should_fail: bool,
}

impl MockPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Player for MockPlayer {
    fn launch(&self, artifact: &Path) -> AgentResult<Box<dyn PlaybackHandle>> {
        if self.should_fail {
            return Err(AgentError::PlaybackLaunchFailed(format!(
                "mock player refused {}",
                artifact.display()
            )));
        }
        let probe = &self.probe;
        let live = probe.live.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_live.fetch_max(live, Ordering::SeqCst);
        probe.launches.fetch_add(1, Ordering::SeqCst);

        let running = Arc::new(AtomicBool::new(true));
        probe.handles.lock().unwrap().push(running.clone());
        Ok(Box::new(MockHandle {
            running,
            live: probe.live.clone(),
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Debug)]
struct MockHandle {
    running: Arc<AtomicBool>,
    live: Arc<AtomicUsize>,
}

impl PlaybackHandle for MockHandle {
    fn is_running(&mut self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn terminate(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
