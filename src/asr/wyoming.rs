//! Wyoming Protocol Client
//!
//! Implements the Wyoming protocol for external ASR services.
//! Wyoming events are a JSON header line, optionally followed by
//! `data_length` bytes of extra JSON data and `payload_length` bytes of
//! binary payload (raw PCM for audio chunks).
//!
//! Wyoming transcribes whole utterances, so [`WyomingRecognizer`] runs a small
//! energy-based [`Endpointer`] over the frame stream and only talks to the
//! server once speech has ended.
//!
//! Reference: https://github.com/rhasspy/wyoming

use super::{Recognizer, Utterance};
use crate::audio::{calculate_energy, AudioFrame};
use crate::error::{AgentError, AgentResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Bytes of PCM per audio-chunk event (one second at 16 kHz)
const CHUNK_BYTES: usize = 32_000;

/// Wyoming event header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WyomingEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_length: Option<usize>,
}

impl WyomingEvent {
    pub fn new(kind: &str, data: Value) -> Self {
        Self {
            kind: kind.to_string(),
            data,
            data_length: None,
            payload_length: None,
        }
    }
}

/// Write one event with an optional binary payload
pub async fn write_event<W>(writer: &mut W, mut event: WyomingEvent, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    event.payload_length = if payload.is_empty() {
        None
    } else {
        Some(payload.len())
    };
    let mut line = serde_json::to_vec(&event)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    if !payload.is_empty() {
        writer.write_all(payload).await?;
    }
    Ok(())
}

/// Read one event and its payload; `None` at end of stream
pub async fn read_event<R>(reader: &mut R) -> Result<Option<(WyomingEvent, Vec<u8>)>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }

    let mut event: WyomingEvent =
        serde_json::from_str(line.trim()).context("Malformed Wyoming event header")?;

    if let Some(len) = event.data_length.take() {
        let mut extra = vec![0u8; len];
        reader.read_exact(&mut extra).await?;
        let extra: Value = serde_json::from_slice(&extra)?;
        match (&mut event.data, extra) {
            (Value::Object(data), Value::Object(extra)) => data.extend(extra),
            (data, extra) => *data = extra,
        }
    }

    let mut payload = Vec::new();
    if let Some(len) = event.payload_length {
        payload.resize(len, 0);
        reader.read_exact(&mut payload).await?;
    }

    Ok(Some((event, payload)))
}

/// Wyoming client for ASR services
#[derive(Debug, Clone)]
pub struct WyomingClient {
    host: String,
    port: u16,
    sample_rate: u32,
    timeout: Duration,
}

impl WyomingClient {
    /// Create a new Wyoming client
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            sample_rate: 16000,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the server is available
    pub async fn health_check(&self) -> bool {
        match TcpStream::connect((&*self.host, self.port)).await {
            Ok(_) => {
                debug!("Wyoming server available at {}:{}", self.host, self.port);
                true
            }
            Err(e) => {
                warn!("Wyoming server not available: {}", e);
                false
            }
        }
    }

    /// Transcribe one utterance of s16le mono PCM
    pub async fn transcribe(&self, audio_data: &[u8]) -> Result<String> {
        tokio::time::timeout(self.timeout, self.transcribe_inner(audio_data))
            .await
            .context("Timeout waiting for transcript")?
    }

    async fn transcribe_inner(&self, audio_data: &[u8]) -> Result<String> {
        let stream = TcpStream::connect((&*self.host, self.port))
            .await
            .context("Failed to connect to Wyoming server")?;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        // Describe handshake
        write_event(&mut writer, WyomingEvent::new("describe", Value::Null), &[]).await?;
        writer.flush().await?;
        loop {
            match read_event(&mut reader).await? {
                Some((event, _)) if event.kind == "info" => break,
                Some((event, _)) => debug!("Wyoming handshake skipped '{}'", event.kind),
                None => anyhow::bail!("Wyoming server closed during handshake"),
            }
        }

        let format = serde_json::json!({
            "rate": self.sample_rate,
            "width": 2,
            "channels": 1
        });

        write_event(&mut writer, WyomingEvent::new("transcribe", Value::Null), &[]).await?;
        write_event(&mut writer, WyomingEvent::new("audio-start", format.clone()), &[]).await?;
        for chunk in audio_data.chunks(CHUNK_BYTES) {
            write_event(&mut writer, WyomingEvent::new("audio-chunk", format.clone()), chunk)
                .await?;
        }
        write_event(&mut writer, WyomingEvent::new("audio-stop", Value::Null), &[]).await?;
        writer.flush().await?;

        debug!(
            "Sent audio ({} bytes), waiting for transcript...",
            audio_data.len()
        );

        while let Some((event, _)) = read_event(&mut reader).await? {
            if event.kind == "transcript" {
                let text = event
                    .data
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                info!("📝 Wyoming transcript: '{}'", text);
                return Ok(text);
            }
        }

        anyhow::bail!("Wyoming server closed before sending a transcript")
    }
}

/// Energy-based utterance segmentation
///
/// Leading silence is discarded. Once a frame crosses the energy threshold,
/// audio is buffered until `silence` worth of quiet frames follow it or the
/// buffer reaches `max_utterance`.
#[derive(Debug, Clone)]
pub struct Endpointer {
    threshold: f32,
    silence_samples: usize,
    max_samples: usize,
    buffer: Vec<u8>,
    in_speech: bool,
    trailing_silence: usize,
}

impl Endpointer {
    pub fn new(sample_rate: u32, threshold: f32, silence: Duration, max_utterance: Duration) -> Self {
        let to_samples = |d: Duration| (d.as_millis() as usize * sample_rate as usize) / 1000;
        Self {
            threshold,
            silence_samples: to_samples(silence).max(1),
            max_samples: to_samples(max_utterance).max(1),
            buffer: Vec::new(),
            in_speech: false,
            trailing_silence: 0,
        }
    }

    /// Feed a frame; returns the utterance PCM when it ends
    pub fn push(&mut self, frame: &AudioFrame) -> Option<Vec<u8>> {
        let samples = frame.samples();
        let loud = calculate_energy(&samples) >= self.threshold;

        if loud {
            self.in_speech = true;
            self.trailing_silence = 0;
        } else if self.in_speech {
            self.trailing_silence += samples.len();
        } else {
            return None;
        }
        self.buffer.extend_from_slice(frame.as_bytes());

        let buffered_samples = self.buffer.len() / 2;
        if self.trailing_silence >= self.silence_samples || buffered_samples >= self.max_samples {
            return Some(self.take());
        }
        None
    }

    pub fn is_in_speech(&self) -> bool {
        self.in_speech
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_speech = false;
        self.trailing_silence = 0;
    }

    fn take(&mut self) -> Vec<u8> {
        let pcm = std::mem::take(&mut self.buffer);
        self.reset();
        pcm
    }
}

/// Streaming recognizer over a Wyoming server
pub struct WyomingRecognizer {
    client: WyomingClient,
    endpointer: Endpointer,
    pending: Option<Utterance>,
}

impl WyomingRecognizer {
    pub fn new(client: WyomingClient, endpointer: Endpointer) -> Self {
        Self {
            client,
            endpointer,
            pending: None,
        }
    }
}

#[async_trait]
impl Recognizer for WyomingRecognizer {
    async fn accept_frame(&mut self, frame: &AudioFrame) -> AgentResult<bool> {
        let Some(pcm) = self.endpointer.push(frame) else {
            return Ok(false);
        };

        let text = self
            .client
            .transcribe(&pcm)
            .await
            .map_err(|e| AgentError::RecognitionStream(format!("{:#}", e)))?;
        self.pending = Some(Utterance::final_text(text));
        Ok(true)
    }

    fn take_result(&mut self) -> Utterance {
        self.pending.take().unwrap_or_default()
    }

    fn reset(&mut self) {
        self.endpointer.reset();
        self.pending = None;
    }

    fn name(&self) -> &str {
        "wyoming"
    }
}
