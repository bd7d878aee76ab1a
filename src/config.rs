use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::audio::OverflowPolicy;
use crate::audit::AuditLog;
use crate::core::intent::MatchThresholds;
use crate::error::{AgentError, AgentResult};

/// One entry of the command table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Trigger phrase matched against the utterance
    pub phrase: String,
    /// Spoken acknowledgement
    #[serde(default)]
    pub say: Option<String>,
    /// Programs to run, in order (argv form)
    #[serde(default)]
    pub run: Vec<Vec<String>>,
    /// Spawn the programs and return instead of waiting for them
    #[serde(default)]
    pub detach: bool,
    /// Per-program time limit when waiting
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Append the last program's stdout to the spoken line
    #[serde(default)]
    pub speak_output: bool,
    /// Have the assistant summarize the last program's stdout, then speak it
    #[serde(default)]
    pub summarize: bool,
    /// Post the result (output, summary or spoken line) as a desktop notification
    #[serde(default)]
    pub notify: bool,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Meta
    pub agent_name: String,
    pub log_level: String,

    // Audio input
    pub audio_source: String,
    pub audio_device: Option<usize>,
    pub sample_rate: u32,
    pub mic_block_size: u32,
    pub audio_udp_bind: String,
    pub frame_queue_capacity: usize,
    pub frame_overflow: OverflowPolicy,

    // Recognition
    pub asr_engine: String,
    pub vosk_model_path: String,
    pub wyoming_host: String,
    pub wyoming_port: u16,
    pub wyoming_timeout_secs: u64,
    pub vad_energy_threshold: f32,
    pub vad_silence_ms: u64,
    pub max_utterance_ms: u64,

    // Control channel
    pub control_enabled: bool,
    pub control_bind: String,
    pub audit_log_path: Option<PathBuf>,

    // Speech
    pub piper_binary: String,
    pub piper_model: String,
    pub piper_model_config: String,
    pub artifact_extension: String,
    pub synthesis_timeout_secs: u64,
    pub player_program: String,
    pub player_args: Vec<String>,
    pub greeting: String,

    // Matching
    pub thresholds: MatchThresholds,
    pub wake_words: Vec<String>,
    pub interrupt_words: Vec<String>,
    pub wake_responses: Vec<String>,
    pub dont_understand_responses: Vec<String>,
    pub command_timeout: u64,

    // AI
    pub ollama_enabled: bool,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_timeout_secs: u64,
    pub system_prompt: String,
    pub summary_prompt: String,
    pub session_id: String,
    pub history_path: PathBuf,
    pub history_limit: usize,

    // Data
    pub commands: Vec<CommandConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_default().join("hark");
        let voices = data_dir.join("voices/libritts_r");

        Self {
            agent_name: "hark".to_string(),
            log_level: "INFO".to_string(),

            audio_source: "udp".to_string(),
            audio_device: None,
            sample_rate: 16000,
            mic_block_size: 8000,
            audio_udp_bind: "0.0.0.0:2012".to_string(),
            frame_queue_capacity: 256,
            frame_overflow: OverflowPolicy::DropOldest,

            asr_engine: "wyoming".to_string(),
            vosk_model_path: data_dir
                .join("models/vosk-model-small-en-us-0.15")
                .to_string_lossy()
                .to_string(),
            wyoming_host: "127.0.0.1".to_string(),
            wyoming_port: 10300,
            wyoming_timeout_secs: 30,
            vad_energy_threshold: 500.0,
            vad_silence_ms: 700,
            max_utterance_ms: 15_000,

            control_enabled: true,
            control_bind: "0.0.0.0:2013".to_string(),
            audit_log_path: Some(AuditLog::default_path()),

            piper_binary: "piper".to_string(),
            piper_model: voices.join("model.onnx").to_string_lossy().to_string(),
            piper_model_config: voices.join("model.onnx.json").to_string_lossy().to_string(),
            artifact_extension: ".wav".to_string(),
            synthesis_timeout_secs: 30,
            player_program: "mpv".to_string(),
            player_args: vec!["--volume=100".to_string()],
            greeting: "Systems online. Microphone active.".to_string(),

            thresholds: MatchThresholds::default(),
            wake_words: vec!["hey".to_string()],
            interrupt_words: vec!["stop".to_string(), "shut up".to_string()],
            wake_responses: strings(&[
                "Locked and loaded.",
                "What's the mission?",
                "Say the word.",
                "Standing by.",
                "Online. Ready for orders.",
                "At your command.",
                "You rang?",
                "All ears.",
                "Talk to me.",
                "Engaged.",
            ]),
            dont_understand_responses: strings(&[
                "That doesn't compute.",
                "Come again?",
                "You might want to rephrase that.",
                "That one flew right past me.",
                "That's not in my playbook.",
                "Negative. Clarify your intent.",
            ]),
            command_timeout: 8,

            ollama_enabled: false,
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "gemma3:1b".to_string(),
            ollama_timeout_secs: 60,
            system_prompt: "You are a terse desktop voice assistant. Answer in one line, \
                            English only, no emojis."
                .to_string(),
            summary_prompt: "You are a professional summarizer. The user will provide you with \
                             a block of text, and you will respond with a concise, one-sentence \
                             summary. Do not add any extra commentary, just the summary."
                .to_string(),
            session_id: "local-chat".to_string(),
            history_path: data_dir.join("chat_history.json"),
            history_limit: 40,

            commands: default_commands(),
        }
    }
}

impl Config {
    /// Load config from `path` (or the default location), falling back to
    /// defaults when missing or unreadable
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(config_path);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                // Graceful degradation: log warning and use defaults
                tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                // Backup corrupt file for debugging
                let backup_path = config_path.with_extension("json.corrupt");
                if let Err(e) = std::fs::rename(&config_path, &backup_path) {
                    tracing::warn!(
                        "⚠️ Could not back up {} to {}: {}",
                        config_path.display(),
                        backup_path.display(),
                        e
                    );
                }
                Ok(Self::default())
            }
        }
    }

    /// Save config to `path` (or the default location)
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(config_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Reject settings the agent cannot run with
    pub fn validate(&self) -> AgentResult<()> {
        let t = self.thresholds;
        for (name, value) in [("wake", t.wake), ("interrupt", t.interrupt), ("command", t.command)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(AgentError::Config(format!(
                    "{} threshold {} is outside 0-100",
                    name, value
                )));
            }
        }
        if self.frame_queue_capacity == 0 {
            return Err(AgentError::Config("frame_queue_capacity must be at least 1".into()));
        }
        if self.sample_rate == 0 {
            return Err(AgentError::Config("sample_rate must be positive".into()));
        }
        if let Some(c) = self.commands.iter().find(|c| c.phrase.trim().is_empty()) {
            return Err(AgentError::Config(format!("command with empty phrase: {:?}", c.run)));
        }
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hark")
        .join("config.json")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn command(phrase: &str, say: &str, run: &[&[&str]]) -> CommandConfig {
    CommandConfig {
        phrase: phrase.to_string(),
        say: Some(say.to_string()),
        run: run.iter().map(|argv| strings(argv)).collect(),
        detach: false,
        timeout_secs: Some(10),
        speak_output: false,
        summarize: false,
        notify: false,
    }
}

fn launcher(phrase: &str, say: &str, argv: &[&str]) -> CommandConfig {
    CommandConfig {
        detach: true,
        timeout_secs: None,
        ..command(phrase, say, &[argv])
    }
}

/// The stock desktop command table
pub fn default_commands() -> Vec<CommandConfig> {
    vec![
        launcher("open firefox", "Opening firefox", &["firefox"]),
        launcher("open discord", "Opening discord", &["discord"]),
        launcher("open terminal", "Opening terminal", &["kitty"]),
        launcher("open youtube", "Opening youtube", &["firefox", "youtube.com"]),
        launcher("open obs studio", "Opening obs studio", &["obs"]),
        launcher("files", "Opening file explorer", &["nautilus"]),
        launcher("take a screenshot", "Taking screenshot", &["grim"]),
        command("play music", "Playing music", &[&["mpc", "play"]]),
        command("toggle music", "Pausing music", &[&["mpc", "toggle"]]),
        command("stop music", "Stopping music", &[&["mpc", "pause"]]),
        command("next song", "Playing next music track", &[&["mpc", "next"]]),
        command("skip song", "Playing next music track", &[&["mpc", "next"]]),
        command(
            "previous song",
            "Playing previous music track",
            &[&["mpc", "prev"]],
        ),
        command("volume up", "Increasing volume", &[&["mpc", "volume", "+10"]]),
        command("volume down", "Decreasing volume", &[&["mpc", "volume", "-10"]]),
        command(
            "volume mute",
            "Muting music",
            &[&["pactl", "set-sink-mute", "@DEFAULT_SINK@", "1"]],
        ),
        command(
            "mute microphone",
            "Muting microphone",
            &[&["pactl", "set-source-mute", "@DEFAULT_SOURCE@", "1"]],
        ),
        command(
            "keyboard backlight on",
            "Keyboard backlight on",
            &[&["brightnessctl", "-d", "tpacpi::kbd_backlight", "set", "2"]],
        ),
        command(
            "keyboard backlight off",
            "Keyboard backlight off",
            &[&["brightnessctl", "-d", "tpacpi::kbd_backlight", "set", "0"]],
        ),
        CommandConfig {
            speak_output: true,
            ..command("what time is it", "The time now is", &[&["date", "+%H:%M"]])
        },
        CommandConfig {
            speak_output: true,
            ..command("today", "Today is", &[&["date", "+%A, %B %d"]])
        },
        CommandConfig {
            notify: true,
            ..command("show calendar", "Here is your calendar", &[&["cal"]])
        },
        CommandConfig {
            say: None,
            summarize: true,
            notify: true,
            ..command("selection", "", &[&["wl-paste", "-p"]])
        },
        command("shut up", "Okay, I'll shut up", &[]),
        command("shut the fuck up", "Okay, I'll shut the fuck up", &[]),
        launcher("lock screen", "Locking the screen", &["swaylock"]),
        command("power off", "Sayonara", &[&["shutdown", "now"]]),
        command("shutdown now", "Sayonara", &[&["shutdown", "now"]]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_settings() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.thresholds.command = 150.0;
        assert!(matches!(config.validate(), Err(AgentError::Config(_))));

        let config = Config {
            frame_queue_capacity: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.commands[0].phrase = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.asr_engine, "wyoming");
        assert_eq!(config.audio_source, "udp");
        assert_eq!(config.control_bind, "0.0.0.0:2013");
        assert_eq!(config.thresholds.wake, 80.0);
        assert_eq!(config.thresholds.command, 50.0);
        assert_eq!(config.wake_words, vec!["hey".to_string()]);
        assert!(!config.ollama_enabled);
    }

    #[test]
    fn test_default_commands_have_unique_phrases() {
        let commands = default_commands();
        let mut phrases: Vec<&str> = commands.iter().map(|c| c.phrase.as_str()).collect();
        phrases.sort();
        phrases.dedup();
        assert_eq!(phrases.len(), commands.len());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{"agent_name": "bhu2", "thresholds": {"command": 60}}"#;
        let config: Config = serde_json::from_str(json).expect("partial config parses");
        assert_eq!(config.agent_name, "bhu2");
        assert_eq!(config.thresholds.command, 60.0);
        assert_eq!(config.thresholds.wake, 80.0);
        assert_eq!(config.piper_binary, "piper");
    }

    #[test]
    fn test_config_roundtrip_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/config.json");

        let mut config = Config::default();
        config.agent_name = "kongming".to_string();
        config.save(Some(&path)).expect("save");

        let restored = Config::load(Some(&path)).expect("load");
        assert_eq!(restored.agent_name, "kongming");
        assert_eq!(restored.commands, config.commands);
    }

    #[test]
    fn test_config_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not valid json").expect("write");

        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config.agent_name, "hark");
        assert!(!path.exists());
        assert!(dir.path().join("config.json.corrupt").exists());
    }
}
