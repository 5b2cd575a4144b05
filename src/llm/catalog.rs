//! Known OpenRouter models.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub supports_reasoning: bool,
}

/// Sorted by capability and price, free models first.
pub const AVAILABLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "x-ai/grok-4.1-fast:free",
        name: "xAI: Grok 4.1 Fast (free)",
        description: "Free, 2M context, great for testing",
        supports_reasoning: true,
    },
    ModelInfo {
        id: "google/gemini-2.0-flash-exp:free",
        name: "Google: Gemini 2.0 Flash (free)",
        description: "Free, fast, 1M context",
        supports_reasoning: true,
    },
    ModelInfo {
        id: "meta-llama/llama-3.3-70b-instruct:free",
        name: "Meta: Llama 3.3 70B (free)",
        description: "Free, powerful open model",
        supports_reasoning: false,
    },
    ModelInfo {
        id: "qwen/qwen3-235b-a22b:free",
        name: "Qwen: Qwen3 235B (free)",
        description: "Free, massive 235B model",
        supports_reasoning: true,
    },
    ModelInfo {
        id: "deepseek/deepseek-v3.1-terminus",
        name: "DeepSeek: V3.1 Terminus",
        description: "Very cheap, excellent reasoning",
        supports_reasoning: true,
    },
    ModelInfo {
        id: "openai/gpt-5.1-codex-mini",
        name: "OpenAI: GPT-5.1 Codex Mini",
        description: "Fast coding model, 400K context",
        supports_reasoning: true,
    },
    ModelInfo {
        id: "anthropic/claude-haiku-4.5",
        name: "Anthropic: Claude Haiku 4.5",
        description: "Fast and cheap, good quality",
        supports_reasoning: true,
    },
    ModelInfo {
        id: "anthropic/claude-sonnet-4.5",
        name: "Anthropic: Claude Sonnet 4.5",
        description: "Balanced speed and capability",
        supports_reasoning: true,
    },
    ModelInfo {
        id: "openai/gpt-5.1",
        name: "OpenAI: GPT-5.1",
        description: "Frontier model, adaptive reasoning",
        supports_reasoning: true,
    },
    ModelInfo {
        id: "openai/gpt-5.1-codex",
        name: "OpenAI: GPT-5.1 Codex",
        description: "Best for complex coding tasks",
        supports_reasoning: true,
    },
    ModelInfo {
        id: "google/gemini-3-pro-preview",
        name: "Google: Gemini 3 Pro",
        description: "1M context, multimodal reasoning",
        supports_reasoning: true,
    },
];

pub fn find(id: &str) -> Option<&'static ModelInfo> {
    AVAILABLE_MODELS.iter().find(|m| m.id == id)
}

/// Unknown models are treated as non-reasoning.
pub fn supports_reasoning(id: &str) -> bool {
    find(id).is_some_and(|m| m.supports_reasoning)
}

pub fn is_free(id: &str) -> bool {
    id.contains(":free")
}

/// `anthropic/claude-sonnet-4.5` → `Anthropic`.
pub fn provider_of(id: &str) -> String {
    let prefix = id.split('/').next().unwrap_or(id);
    let mut chars = prefix.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Catalog name, else the part after the provider prefix.
pub fn display_name(id: &str) -> String {
    match find(id) {
        Some(m) => m.name.to_string(),
        None => id.split_once('/').map_or(id, |(_, rest)| rest).to_string(),
    }
}

pub fn description_of(id: &str) -> Option<&'static str> {
    find(id).map(|m| m.description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_unique() {
        let mut ids: Vec<_> = AVAILABLE_MODELS.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), AVAILABLE_MODELS.len());
    }

    #[test]
    fn test_reasoning_flags() {
        assert!(supports_reasoning("anthropic/claude-sonnet-4.5"));
        assert!(!supports_reasoning("meta-llama/llama-3.3-70b-instruct:free"));
        assert!(!supports_reasoning("someone/unknown-model"));
    }

    #[test]
    fn test_is_free() {
        assert!(is_free("x-ai/grok-4.1-fast:free"));
        assert!(!is_free("openai/gpt-5.1"));
    }

    #[test]
    fn test_provider_of() {
        assert_eq!(provider_of("anthropic/claude-sonnet-4.5"), "Anthropic");
        assert_eq!(provider_of("x-ai/grok-4.1-fast:free"), "X-ai");
        assert_eq!(provider_of(""), "");
    }

    #[test]
    fn test_display_name_falls_back_to_model_part() {
        assert_eq!(display_name("openai/gpt-5.1"), "OpenAI: GPT-5.1");
        assert_eq!(display_name("mistral/mixtral-8x22b"), "mixtral-8x22b");
        assert_eq!(display_name("bare-model"), "bare-model");
    }
}
