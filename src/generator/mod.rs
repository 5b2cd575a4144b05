//! The two model-backed stages: idea → specification, specification → HTML.

pub mod extract;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::errors::{LlmError, StudioError};
use crate::llm::prompts::{EXPANSION_SYSTEM_PROMPT, GENERATION_SYSTEM_PROMPT};
use crate::llm::{CompletionRequest, Credential, TextGenerationService, catalog};

pub use extract::{Strategy, extract_html, extract_with_strategy};

pub const EXPAND_TIMEOUT: Duration = Duration::from_secs(120);
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(300);

const EXPANSION_TEMPERATURE: f32 = 0.8;
const EXPANSION_MAX_TOKENS: u32 = 2000;
const GENERATION_TEMPERATURE: f32 = 0.7;
const REASONING_MAX_TOKENS: u32 = 16000;
const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Run one request under a hard deadline, whatever the service does with
/// its own timeout.
pub async fn call_with_timeout(
    service: &dyn TextGenerationService,
    req: CompletionRequest,
) -> Result<String, LlmError> {
    let limit = req.timeout;
    match tokio::time::timeout(limit, service.request(req)).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout {
            secs: limit.as_secs(),
        }),
    }
}

/// Expands a terse idea into a build specification.
#[derive(Clone)]
pub struct PromptExpander {
    service: Arc<dyn TextGenerationService>,
    model: String,
    timeout: Duration,
}

impl PromptExpander {
    pub fn new(service: Arc<dyn TextGenerationService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
            timeout: EXPAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn expand(
        &self,
        raw_idea: &str,
        credential: &Credential,
    ) -> Result<String, StudioError> {
        if raw_idea.trim().is_empty() {
            return Err(StudioError::BadRequest("Prompt is required".to_string()));
        }

        let started = Instant::now();
        let req = CompletionRequest {
            system_prompt: EXPANSION_SYSTEM_PROMPT.to_string(),
            user_prompt: raw_idea.to_string(),
            model: self.model.clone(),
            credential: credential.clone(),
            timeout: self.timeout,
            temperature: EXPANSION_TEMPERATURE,
            max_tokens: EXPANSION_MAX_TOKENS,
            reasoning: false,
        };

        match call_with_timeout(self.service.as_ref(), req).await {
            Ok(spec) => {
                info!(
                    model = %self.model,
                    elapsed_secs = started.elapsed().as_secs(),
                    len = spec.len(),
                    "Prompt expanded"
                );
                Ok(spec)
            }
            Err(e) => {
                warn!(
                    model = %self.model,
                    elapsed_secs = started.elapsed().as_secs(),
                    cause = e.cause(),
                    "Expansion failed: {}",
                    e
                );
                Err(StudioError::Expansion(e))
            }
        }
    }
}

/// Generates a single-file HTML document and extracts it from the reply.
#[derive(Clone)]
pub struct ArtifactGenerator {
    service: Arc<dyn TextGenerationService>,
    timeout: Duration,
}

impl ArtifactGenerator {
    pub fn new(service: Arc<dyn TextGenerationService>) -> Self {
        Self {
            service,
            timeout: GENERATE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `system_prompt` overrides the default generation instruction (fix and
    /// edit use their own).
    pub async fn generate(
        &self,
        prompt: &str,
        credential: &Credential,
        model: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, StudioError> {
        let reasoning = catalog::supports_reasoning(model);
        let started = Instant::now();
        let req = CompletionRequest {
            system_prompt: system_prompt.unwrap_or(GENERATION_SYSTEM_PROMPT).to_string(),
            user_prompt: prompt.to_string(),
            model: model.to_string(),
            credential: credential.clone(),
            timeout: self.timeout,
            temperature: GENERATION_TEMPERATURE,
            max_tokens: if reasoning {
                REASONING_MAX_TOKENS
            } else {
                DEFAULT_MAX_TOKENS
            },
            reasoning,
        };

        let reply = match call_with_timeout(self.service.as_ref(), req).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    model = %model,
                    elapsed_secs = started.elapsed().as_secs(),
                    cause = e.cause(),
                    "Generation failed: {}",
                    e
                );
                return Err(StudioError::Generation(e));
            }
        };

        let (html, strategy) = extract_with_strategy(&reply);
        debug!(strategy = strategy.name(), "HTML extracted");
        info!(
            model = %model,
            elapsed_secs = started.elapsed().as_secs(),
            len = html.len(),
            "Artifact generated"
        );
        Ok(html)
    }
}
