//! Chat-completion client used by the model-backed chunking strategy

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::{OpenAiClient, OpenAiConfig};

/// A chat message for the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Backend able to answer a chat completion with a JSON object body.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send the messages in JSON-object response mode and return the raw
    /// assistant content (expected to be a JSON document).
    async fn complete_json(&self, messages: Vec<Message>) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} {body}")]
    Api { status: u16, body: String },
    #[error("API rejected credentials: {status} {body}")]
    Unauthorized { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}
