//! OpenRouter chat-completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{CompletionRequest, Message, TextGenerationService};
use crate::config::LlmSection;
use crate::errors::LlmError;

const DEFAULT_REFERER: &str = "https://github.com/vibecode/vibecode";

/// Connection settings, taken from the `[llm]` config section.
#[derive(Debug, Clone)]
pub struct OpenRouterSettings {
    pub base_url: String,
    pub referer: String,
    pub title: String,
}

impl From<&LlmSection> for OpenRouterSettings {
    fn from(llm: &LlmSection) -> Self {
        Self {
            base_url: llm.base_url.clone(),
            referer: llm
                .referer
                .clone()
                .unwrap_or_else(|| DEFAULT_REFERER.to_string()),
            title: llm.title.clone(),
        }
    }
}

/// Built once at startup and shared by reference.
#[derive(Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    settings: OpenRouterSettings,
}

impl OpenRouterClient {
    pub fn new(settings: OpenRouterSettings) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, settings })
    }
}

#[async_trait]
impl TextGenerationService for OpenRouterClient {
    async fn request(&self, req: CompletionRequest) -> Result<String, LlmError> {
        debug!(
            provider = "openrouter",
            model = %req.model,
            max_tokens = req.max_tokens,
            temperature = req.temperature,
            reasoning = req.reasoning,
            timeout_secs = req.timeout.as_secs(),
            "Sending completion request"
        );

        let body = ChatRequest {
            model: &req.model,
            messages: req.messages(),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            reasoning: req.reasoning.then_some(Reasoning { effort: "high" }),
            stream: false,
        };

        let response = self
            .http
            .post(&self.settings.base_url)
            .bearer_auth(req.credential.expose())
            .header("HTTP-Referer", &self.settings.referer)
            .header("X-Title", &self.settings.title)
            .timeout(req.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport(e, req.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_transport(e, req.timeout))?;

        if !status.is_success() {
            return Err(LlmError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let content = parse_reply(&text)?;
        debug!(provider = "openrouter", len = content.len(), "Completion received");
        Ok(content)
    }
}

fn map_transport(e: reqwest::Error, timeout: Duration) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout {
            secs: timeout.as_secs(),
        }
    } else {
        LlmError::Transport(e.to_string())
    }
}

/// Decode a chat-completions body into the first choice's text.
pub fn parse_reply(body: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::Transport(format!("Failed to parse response: {}", e)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<Reasoning>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Reasoning {
    effort: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
