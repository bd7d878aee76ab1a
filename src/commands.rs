//! Command dispatch module
//!
//! Phrase → action registry built once at startup. Actions are opaque to the
//! agent: it invokes the matched one exactly once and reports any failure.

use crate::config::CommandConfig;
use crate::core::text_normalizer::clean_reply;
use crate::core::{Conversation, PhraseCatalog};
use crate::error::{AgentError, AgentResult};
use crate::playback::PlaybackController;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// What an action gets to work with
#[derive(Clone)]
pub struct ActionContext {
    /// Voice output, for actions that answer out loud
    pub voice: Arc<PlaybackController>,
    /// Catalog phrase that matched
    pub phrase: String,
    /// Text as heard
    pub utterance: String,
    /// Assistant for actions that summarize, when one is configured
    pub conversation: Option<Arc<dyn Conversation>>,
}

impl ActionContext {
    /// Speak best-effort; a speech failure never fails the action
    pub async fn say(&self, text: &str) {
        if let Err(e) = self.voice.speak(text).await {
            warn!("⚠️ Could not speak for '{}': {}", self.phrase, e);
        }
    }
}

/// A side-effecting capability bound to a phrase
#[async_trait]
pub trait Action: Send + Sync {
    async fn execute(&self, ctx: &ActionContext) -> Result<()>;

    /// Short description for logs
    fn describe(&self) -> String {
        "action".to_string()
    }
}

/// Wraps a plain closure as an [`Action`]
pub struct FnAction<F> {
    name: String,
    func: F,
}

impl<F> FnAction<F>
where
    F: Fn(&ActionContext) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: Fn(&ActionContext) -> Result<()> + Send + Sync,
{
    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        (self.func)(ctx)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Configured desktop command: say a line, run programs, maybe speak the output
#[derive(Debug, Clone)]
pub struct ShellAction {
    say: Option<String>,
    run: Vec<Vec<String>>,
    detach: bool,
    timeout: Option<Duration>,
    speak_output: bool,
    summarize: bool,
    notify: bool,
}

impl From<&CommandConfig> for ShellAction {
    fn from(config: &CommandConfig) -> Self {
        Self {
            say: config.say.clone(),
            run: config.run.clone(),
            detach: config.detach,
            timeout: config.timeout_secs.map(Duration::from_secs),
            speak_output: config.speak_output,
            summarize: config.summarize,
            notify: config.notify,
        }
    }
}

impl ShellAction {
    async fn run_one(&self, argv: &[String]) -> Result<String> {
        let (program, args) = argv
            .split_first()
            .context("Empty command line")?;

        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null());

        if self.detach {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
            let child = cmd
                .spawn()
                .with_context(|| format!("Failed to launch {}", program))?;
            debug!("🚀 Launched {} (pid {:?})", program, child.id());
            return Ok(String::new());
        }

        cmd.kill_on_drop(true);
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| anyhow::anyhow!("{} timed out after {:?}", program, limit))?,
            None => cmd.output().await,
        }
        .with_context(|| format!("Failed to run {}", program))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn summarize_output(&self, ctx: &ActionContext, output: &str) -> Result<String> {
        let conversation = ctx
            .conversation
            .as_ref()
            .context("No assistant configured to summarize with")?;
        if output.is_empty() {
            anyhow::bail!("Nothing to summarize");
        }
        let summary = conversation
            .summarize(output)
            .await
            .context("Summary request failed")?;
        Ok(clean_reply(&summary))
    }

    /// Best-effort desktop notification titled with the phrase
    async fn notify(&self, ctx: &ActionContext, body: &str) {
        let status = Command::new("notify-send")
            .arg(&ctx.phrase)
            .arg(body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("⚠️ notify-send exited with {}", status),
            Err(e) => warn!("⚠️ Desktop notification failed: {}", e),
        }
    }
}

#[async_trait]
impl Action for ShellAction {
    async fn execute(&self, ctx: &ActionContext) -> Result<()> {
        if !self.speak_output {
            if let Some(line) = &self.say {
                ctx.say(line).await;
            }
        }

        let mut last_output = String::new();
        for argv in &self.run {
            last_output = self.run_one(argv).await?;
        }

        let mut message = last_output;
        if self.summarize {
            message = self.summarize_output(ctx, &message).await?;
            ctx.say(&message).await;
        } else if self.speak_output {
            if let Some(prefix) = &self.say {
                message = format!("{} {}", prefix, message).trim().to_string();
            }
            ctx.say(&message).await;
        }

        if self.notify {
            let body = match (&self.say, message.is_empty()) {
                (Some(line), true) => line.as_str(),
                _ => message.as_str(),
            };
            self.notify(ctx, body).await;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        if self.summarize {
            return "summarize".to_string();
        }
        match self.run.first().and_then(|argv| argv.first()) {
            Some(program) => format!("run {}", program),
            None => "say".to_string(),
        }
    }
}

/// Immutable phrase → action table
#[derive(Clone, Default)]
pub struct CommandRegistry {
    catalog: PhraseCatalog<Arc<dyn Action>>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.catalog.phrases()).finish()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the configured command table
    pub fn from_config(commands: &[CommandConfig]) -> Self {
        let mut registry = Self::new();
        for command in commands {
            registry.register(&command.phrase, Arc::new(ShellAction::from(command)));
        }
        info!("📋 Registered {} commands", registry.len());
        registry
    }

    /// Bind `phrase`; the first binding of a phrase wins
    pub fn register(&mut self, phrase: &str, action: Arc<dyn Action>) -> bool {
        let added = self.catalog.insert(phrase, action);
        if !added {
            warn!("⚠️ Ignoring duplicate or blank command phrase '{}'", phrase);
        }
        added
    }

    pub fn catalog(&self) -> &PhraseCatalog<Arc<dyn Action>> {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

/// Invoke `action` once; errors and panics come back as `ActionFailed`
pub async fn dispatch(action: &dyn Action, ctx: &ActionContext) -> AgentResult<()> {
    info!("⚡ Executing '{}' ({})", ctx.phrase, action.describe());
    match AssertUnwindSafe(action.execute(ctx)).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(AgentError::ActionFailed {
            phrase: ctx.phrase.clone(),
            reason: format!("{:#}", e),
        }),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "action panicked".to_string());
            Err(AgentError::ActionFailed {
                phrase: ctx.phrase.clone(),
                reason: format!("panic: {}", reason),
            })
        }
    }
}
