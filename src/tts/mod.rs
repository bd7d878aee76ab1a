//! TTS (Text-to-Speech) Module
//!
//! The synthesizer is an external process speaking a line protocol: one line
//! of text in, then lines out until one names the rendered audio file.
//! [`LineSynthesizer`] implements that framing over any async pipe pair so
//! the protocol can be exercised without a real engine.

pub mod piper;

use crate::error::{AgentError, AgentResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

pub use piper::PiperEngine;

/// Trait for TTS engines
#[async_trait]
pub trait Synthesizer: Send + std::fmt::Debug {
    /// Render `text` and return a reference to the audio artifact
    async fn synthesize(&mut self, text: &str) -> AgentResult<PathBuf>;

    /// Get the engine name
    fn name(&self) -> &str;

    /// Stop the engine process, if any
    async fn shutdown(&mut self) {}
}

/// Line-framed request/response over a persistent pipe
pub struct LineSynthesizer<R, W> {
    reader: R,
    writer: W,
    extension: String,
    timeout: Duration,
}

impl<R, W> std::fmt::Debug for LineSynthesizer<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSynthesizer")
            .field("extension", &self.extension)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<R, W> LineSynthesizer<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, extension: &str, timeout: Duration) -> Self {
        Self {
            reader,
            writer,
            extension: extension.to_string(),
            timeout,
        }
    }

    /// Write one request line, then read until an artifact line arrives
    pub async fn request(&mut self, text: &str) -> AgentResult<PathBuf> {
        let line: String = text
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let timeout = self.timeout;

        let exchange = async {
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
            self.writer.flush().await?;

            let mut response = String::new();
            loop {
                response.clear();
                if self.reader.read_line(&mut response).await? == 0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "synthesis stream closed",
                    ));
                }
                let candidate = response.trim();
                if candidate.ends_with(self.extension.as_str()) {
                    return Ok(PathBuf::from(candidate));
                }
                debug!("Synthesizer output skipped: {}", candidate);
            }
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(path)) => Ok(path),
            Ok(Err(e)) => Err(AgentError::SynthesisUnavailable(e.to_string())),
            Err(_) => Err(AgentError::SynthesisUnavailable(format!(
                "no artifact within {:?}",
                timeout
            ))),
        }
    }
}

#[async_trait]
impl<R, W> Synthesizer for LineSynthesizer<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn synthesize(&mut self, text: &str) -> AgentResult<PathBuf> {
        self.request(text).await
    }

    fn name(&self) -> &str {
        "line"
    }
}
