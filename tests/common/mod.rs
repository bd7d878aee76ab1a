#![allow(dead_code)]

pub mod mock_actions;
pub mod mock_asr;
pub mod mock_tts;

use hark::commands::{Action, CommandRegistry};
use hark::config::Config;
use hark::core::Conversation;
use hark::playback::PlaybackController;
use hark::processor::Processor;
use mock_actions::{FailingAction, RecordingAction};
use mock_asr::MockRecognizer;
use mock_tts::{MockPlayer, MockSynthesizer, PlayerProbe};
use std::net::{SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use std::{fs, thread};
use tempfile::TempDir;

/// A processor wired to mock collaborators
pub struct Harness {
    pub processor: Processor,
    pub voice: Arc<PlaybackController>,
    /// Frames fed and actions run, in order
    pub events: Arc<Mutex<Vec<String>>>,
    /// Text handed to the synthesizer
    pub spoken: Arc<Mutex<Vec<String>>>,
    /// Set to make every synthesis fail
    pub speech_down: Arc<AtomicBool>,
    pub player: PlayerProbe,
}

impl Harness {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    /// Only the `action:` / `failed:` entries
    pub fn actions(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| !e.starts_with("frame:"))
            .collect()
    }
}

pub struct HarnessBuilder {
    config: Config,
    commands: Vec<String>,
    failing: Vec<String>,
    conversation: Option<Arc<dyn Conversation>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        let config = Config {
            wake_responses: vec!["Yes?".to_string()],
            dont_understand_responses: vec!["I don't understand".to_string()],
            command_timeout: 0,
            commands: vec![],
            ..Config::default()
        };
        Self {
            config,
            commands: Vec::new(),
            failing: Vec::new(),
            conversation: None,
        }
    }

    pub fn config(mut self, edit: impl FnOnce(&mut Config)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Bind recording actions to `phrases`
    pub fn commands(mut self, phrases: &[&str]) -> Self {
        self.commands.extend(phrases.iter().map(|p| p.to_string()));
        self
    }

    /// Bind a failing action to `phrase`
    pub fn failing(mut self, phrase: &str) -> Self {
        self.failing.push(phrase.to_string());
        self
    }

    pub fn conversation(mut self, conversation: Arc<dyn Conversation>) -> Self {
        self.conversation = Some(conversation);
        self
    }

    pub fn build(self) -> Harness {
        let events = Arc::new(Mutex::new(Vec::new()));

        let mut registry = CommandRegistry::new();
        for phrase in &self.commands {
            let action: Arc<dyn Action> = Arc::new(RecordingAction {
                events: events.clone(),
            });
            registry.register(phrase, action);
        }
        for phrase in &self.failing {
            let action: Arc<dyn Action> = Arc::new(FailingAction {
                events: events.clone(),
            });
            registry.register(phrase, action);
        }

        let synthesizer = MockSynthesizer::new();
        let spoken = synthesizer.spoken.clone();
        let speech_down = synthesizer.should_fail.clone();
        let player = MockPlayer::new();
        let probe = player.probe.clone();
        let voice = Arc::new(PlaybackController::new(
            Some(Box::new(synthesizer)),
            Box::new(player),
        ));

        let mut processor = Processor::new(
            &self.config,
            Box::new(MockRecognizer::new(events.clone())),
            registry,
            voice.clone(),
        );
        if let Some(conversation) = self.conversation {
            processor = processor.with_conversation(conversation);
        }

        Harness {
            processor,
            voice,
            events,
            spoken,
            speech_down,
            player: probe,
        }
    }
}

/// Poll `check` until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// A free localhost UDP port
pub fn free_udp_addr() -> SocketAddr {
    UdpSocket::bind("127.0.0.1:0")
        .and_then(|s| s.local_addr())
        .expect("Failed to find a free UDP port")
}

/// The `hark` binary running against an isolated config
pub struct TestContext {
    pub temp_dir: TempDir,
    pub child: Child,
    pub config_path: PathBuf,
}

impl TestContext {
    /// Write `config` into a fresh temp dir and start the daemon with it
    pub fn spawn(config: &Config) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bin_path = env!("CARGO_BIN_EXE_hark");

        let config_dir = temp_dir.path().join("config");
        let data_dir = temp_dir.path().join("data");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        fs::create_dir_all(&data_dir).expect("Failed to create data dir");

        let config_path = temp_dir.path().join("config.json");
        config
            .save(Some(&config_path))
            .expect("Failed to write test config");

        let child = Command::new(bin_path)
            .arg("--config")
            .arg(&config_path)
            .env("XDG_CONFIG_HOME", &config_dir)
            .env("XDG_DATA_HOME", &data_dir)
            .env_remove("RUST_LOG")
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .expect("Failed to spawn hark daemon");

        Self {
            temp_dir,
            child,
            config_path,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Exit status if the daemon stops within `timeout`
    pub fn wait_exit(&mut self, timeout: Duration) -> Option<std::process::ExitStatus> {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Some(status);
            }
            thread::sleep(Duration::from_millis(50));
        }
        None
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Poll until `path` exists
pub fn wait_for_file(path: &Path, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if path.exists() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    path.exists()
}
