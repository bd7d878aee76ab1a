//! Piper TTS backend driving a long-lived local binary

use super::{LineSynthesizer, Synthesizer};
use crate::config::Config;
use crate::error::{AgentError, AgentResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, error, info, warn};

type PiperPipe = LineSynthesizer<BufReader<ChildStdout>, ChildStdin>;

#[derive(Debug)]
struct PiperProcess {
    child: Child,
    pipe: PiperPipe,
}

/// Piper engine; the process is spawned once and restarted after a failure
#[derive(Debug)]
pub struct PiperEngine {
    binary: String,
    model: String,
    model_config: String,
    output_dir: PathBuf,
    extension: String,
    timeout: Duration,
    process: Option<PiperProcess>,
}

impl PiperEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.piper_binary.clone(),
            model: config.piper_model.clone(),
            model_config: config.piper_model_config.clone(),
            output_dir: std::env::temp_dir().join("hark-speech"),
            extension: config.artifact_extension.clone(),
            timeout: Duration::from_secs(config.synthesis_timeout_secs),
            process: None,
        }
    }

    /// Spawn the engine now instead of on first use
    pub async fn start(&mut self) -> AgentResult<()> {
        if self.process.is_none() {
            self.process = Some(self.spawn()?);
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    fn spawn(&self) -> AgentResult<PiperProcess> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("-m").arg(&self.model);
        if !self.model_config.is_empty() {
            cmd.arg("-c").arg(&self.model_config);
        }
        cmd.arg("--output_dir")
            .arg(&self.output_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            error!("❌ Failed to spawn {}: {}", self.binary, e);
            AgentError::SynthesisUnavailable(format!("failed to spawn {}: {}", self.binary, e))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            AgentError::SynthesisUnavailable("piper stdin not captured".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            AgentError::SynthesisUnavailable("piper stdout not captured".to_string())
        })?;

        info!("✅ Piper started with model {}", self.model);
        Ok(PiperProcess {
            child,
            pipe: LineSynthesizer::new(BufReader::new(stdout), stdin, &self.extension, self.timeout),
        })
    }

    async fn stop(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.child.kill().await {
                debug!("Piper already exited: {}", e);
            }
        }
    }
}

#[async_trait]
impl Synthesizer for PiperEngine {
    async fn synthesize(&mut self, text: &str) -> AgentResult<PathBuf> {
        if !self.is_running() {
            debug!("Piper not running, spawning");
            self.process = Some(self.spawn()?);
        }
        let Some(process) = self.process.as_mut() else {
            return Err(AgentError::SynthesisUnavailable("piper not running".to_string()));
        };

        debug!("📢 Piper rendering: '{}'", text);
        let result = process.pipe.request(text).await;
        if let Err(e) = &result {
            // A timed-out request leaves a stale artifact line in the pipe
            warn!("⚠️ Piper request failed, restarting on next use: {}", e);
            self.stop().await;
        }
        result
    }

    fn name(&self) -> &str {
        "piper"
    }

    async fn shutdown(&mut self) {
        self.stop().await;
    }
}
