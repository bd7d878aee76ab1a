//! Ollama AI Integration
//!
//! Conversational fallback for utterances that match no command. Each
//! request carries the system prompt, the session's stored history and the
//! new message; the reply is appended to the history file.

use super::history::{ChatHistory, ChatMessage};
use super::{summary_request, Conversation};
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

/// Handles Ollama chat requests with persistent history
#[derive(Debug)]
pub struct OllamaChat {
    client: reqwest::Client,
    url: String,
    model: String,
    system_prompt: String,
    summary_prompt: String,
    history: Mutex<ChatHistory>,
}

impl OllamaChat {
    /// Create new Ollama chat client from config
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ollama_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
            system_prompt: config.system_prompt.clone(),
            summary_prompt: config.summary_prompt.clone(),
            history: Mutex::new(ChatHistory::load(&config.history_path, config.history_limit)),
        })
    }

    /// Health check - verify Ollama is reachable
    pub async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.url))
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// One non-streaming `/api/chat` round trip
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&ChatRequest {
                model: &self.model,
                messages,
                stream: false,
            })
            .send()
            .await
            .context("Ollama request failed")?;

        let status = response.status();
        let body_text = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("Ollama API error ({}): {}", status, body_text);
        }
        debug!("🧠 Ollama raw body: {}", body_text);

        let parsed: ChatResponse = serde_json::from_str(&body_text)
            .with_context(|| format!("Unexpected Ollama response: {}", body_text))?;
        Ok(parsed.message.content)
    }
}

#[async_trait]
impl Conversation for OllamaChat {
    async fn reply(&self, session_id: &str, text: &str) -> Result<String> {
        let mut history = self.history.lock().await;

        let mut messages = Vec::with_capacity(history.messages(session_id).len() + 2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::system(self.system_prompt.as_str()));
        }
        messages.extend(history.messages(session_id).iter().cloned());
        messages.push(ChatMessage::user(text));

        let reply = self.chat(messages).await?;

        history.push(session_id, ChatMessage::user(text));
        history.push(session_id, ChatMessage::assistant(reply.as_str()));
        if let Err(e) = history.save() {
            warn!("⚠️ Failed to save chat history: {}", e);
        }

        Ok(reply)
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let messages = vec![
            ChatMessage::system(self.summary_prompt.as_str()),
            ChatMessage::user(summary_request(text)),
        ];
        self.chat(messages).await
    }
}
