//! Chat Session
//!
//! Sends user text to the remote chat endpoint and keeps the transcript.
//! Transport failures surface as visible system messages and never touch
//! the speech state.

use crate::config::Config;
use crate::error::{AvaError, AvaResult};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

/// The remote chat endpoint, one request/response exchange at a time
#[async_trait]
pub trait ChatTransport: Send + Sync + std::fmt::Debug {
    async fn exchange(&self, message: &str, session_id: &str) -> AvaResult<String>;
}

/// HTTP transport: POST JSON to the configured `/chat` endpoint
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.chat_url.clone(),
            timeout: Duration::from_secs(config.chat_timeout),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn exchange(&self, message: &str, session_id: &str) -> AvaResult<String> {
        let response = self
            .client
            .post(&self.url)
            .json(&ChatRequest {
                message,
                session_id,
            })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AvaError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AvaError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!("❌ Chat endpoint error ({}): {}", status, body);
            return Err(AvaError::Transport(format!(
                "chat endpoint returned {}",
                status
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AvaError::Transport(format!("malformed chat response: {}", e)))?;
        Ok(parsed.response)
    }
}

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    System,
}

impl Sender {
    pub fn display(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "AI",
            Sender::System => "System",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

/// One conversation with the remote endpoint
#[derive(Debug)]
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    session_id: String,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        // Random per-process id, the endpoint keys its memory on it
        let session_id = format!(
            "user_audio_{:09x}",
            rand::thread_rng().gen_range(0u64..0x1000000000)
        );
        debug!("Chat session id: {}", session_id);
        Self {
            transport,
            session_id,
            transcript: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Send one user turn and return the reply text.
    ///
    /// Empty input sends nothing. A transport failure is recorded as a
    /// system message and returned; the session stays usable.
    pub async fn send(&mut self, text: &str) -> AvaResult<Option<String>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        self.push(Sender::User, text);

        match self.transport.exchange(text, &self.session_id).await {
            Ok(reply) => {
                self.push(Sender::Assistant, &reply);
                Ok(Some(reply))
            }
            Err(e) => {
                warn!("❌ Chat transport failed: {}", e);
                self.push(Sender::System, "Error communicating with server.");
                Err(e)
            }
        }
    }

    fn push(&mut self, sender: Sender, text: &str) {
        self.transcript.push(ChatMessage {
            sender,
            text: text.to_string(),
            timestamp: Local::now(),
        });
    }
}
