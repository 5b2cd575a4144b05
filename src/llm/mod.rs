//! Text-generation service boundary.
//!
//! Everything that talks to a model goes through [`TextGenerationService`].
//! The production implementation is [`OpenRouterClient`]; tests substitute
//! scripted fakes.

pub mod catalog;
pub mod openrouter;
pub mod prompts;

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::LlmError;

pub use catalog::{AVAILABLE_MODELS, ModelInfo};
pub use openrouter::{OpenRouterClient, OpenRouterSettings};

/// An API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `None` for an empty or whitespace-only key.
    pub fn from_optional(key: Option<&str>) -> Option<Self> {
        key.map(str::trim)
            .filter(|k| !k.is_empty())
            .map(Self::new)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

/// One chat-completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub credential: Credential,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for high-effort reasoning.
    pub reasoning: bool,
}

impl CompletionRequest {
    pub fn messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.clone()),
            Message::user(self.user_prompt.clone()),
        ]
    }
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Send one request and return the reply text.
    ///
    /// Implementations fail with `Timeout`, `Transport`, `HttpStatus` or
    /// `EmptyResponse`; they never return an empty string.
    async fn request(&self, req: CompletionRequest) -> Result<String, LlmError>;
}
