// Chat server client

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::models::{ApiProfile, AppConfig};

/// Assistant text used when a completions reply carries no choices.
pub const NO_REPLY_TEXT: &str = "Sorry, I could not understand that.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered 2xx but reported an error instead of a reply.
    #[error("{0}")]
    Application(String),
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// The request never completed.
    #[error("network error: {0}")]
    Network(String),
    /// A 2xx body that could not be understood; carries the status text.
    #[error("{0}")]
    Malformed(String),
}

impl ApiError {
    /// HTTP status for errors the server answered with.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The server side of a conversation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one user message and returns the assistant's reply text.
    async fn send_message(&self, message: &str) -> Result<String, ApiError>;

    /// Asks the server to forget the conversation.
    async fn clear(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReplyResponse {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_str().to_string(), str::to_string)
}

/// Pulls a human-readable message out of a failed response body.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error.or(e.message))
        .unwrap_or_else(|| status_text(status))
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    profile: ApiProfile,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, profile: ApiProfile, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            profile,
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.server_url,
            config.profile,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base_url, self.profile.chat_path())
    }

    fn parse_reply(&self, status: StatusCode, body: &str) -> Result<String, ApiError> {
        match self.profile {
            ApiProfile::Reply => {
                let parsed: ReplyResponse = serde_json::from_str(body)
                    .map_err(|_| ApiError::Malformed(status_text(status)))?;
                match (parsed.reply, parsed.error) {
                    (Some(reply), _) => Ok(reply),
                    (None, Some(error)) => Err(ApiError::Application(error)),
                    (None, None) => Err(ApiError::Malformed(status_text(status))),
                }
            }
            ApiProfile::Completions => {
                let parsed: CompletionResponse = serde_json::from_str(body)
                    .map_err(|_| ApiError::Malformed(status_text(status)))?;
                Ok(parsed
                    .choices
                    .into_iter()
                    .next()
                    .map_or_else(|| NO_REPLY_TEXT.to_string(), |c| c.message.content))
            }
        }
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(&self, message: &str) -> Result<String, ApiError> {
        let url = self.chat_url();
        tracing::debug!(%url, chars = message.chars().count(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        self.parse_reply(status, &body)
    }

    async fn clear(&self) -> Result<(), ApiError> {
        let url = format!("{}/clear", self.base_url);
        tracing::debug!(%url, "sending clear request");

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Http {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }
}
