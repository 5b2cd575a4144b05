//! Configuration for vibecode, read from `.vibecode/vibecode.toml`.
//!
//! Layering is file → environment → CLI. The file is optional; every field
//! has a default. Environment values come from the process environment after
//! `.env` has been loaded by the binary.
//!
//! ```toml
//! [server]
//! port = 3141
//! db_path = ".vibecode/vibecode.db"
//! dev_mode = false
//!
//! [llm]
//! base_url = "https://openrouter.ai/api/v1/chat/completions"
//! api_key_env = "OPENROUTER_API_KEY"
//! default_model = "x-ai/grok-4.1-fast:free"
//! expansion_model = "x-ai/grok-4.1-fast:free"
//! expand_timeout_secs = 120
//! generate_timeout_secs = 300
//! title = "Vibe Coding TG App"
//!
//! [generation]
//! free_mode = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding config and database, relative to the working directory.
pub const VIBECODE_DIR: &str = ".vibecode";
pub const CONFIG_FILE: &str = "vibecode.toml";

/// Env var consulted when `api_key_env` is unset in the environment.
pub const FALLBACK_KEY_ENV: &str = "OPENROUTER_API";

pub const DEFAULT_MODEL: &str = "x-ai/grok-4.1-fast:free";

pub fn default_config_path() -> PathBuf {
    Path::new(VIBECODE_DIR).join(CONFIG_FILE)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Permissive CORS for a separately served frontend.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_port() -> u16 {
    3141
}

fn default_db_path() -> String {
    format!("{}/vibecode.db", VIBECODE_DIR)
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
            dev_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the server API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_model")]
    pub expansion_model: String,
    #[serde(default = "default_expand_timeout")]
    pub expand_timeout_secs: u64,
    #[serde(default = "default_generate_timeout")]
    pub generate_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_expand_timeout() -> u64 {
    120
}

fn default_generate_timeout() -> u64 {
    300
}

fn default_title() -> String {
    "Vibe Coding TG App".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            expansion_model: default_model(),
            expand_timeout_secs: default_expand_timeout(),
            generate_timeout_secs: default_generate_timeout(),
            referer: None,
            title: default_title(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    /// Fix and edit always use the server key.
    #[serde(default)]
    pub free_mode: bool,
}

/// Contents of `vibecode.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VibecodeToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub generation: GenerationSection,
}

impl VibecodeToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse vibecode.toml")
    }

    /// Returns the default configuration if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize vibecode.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.llm.expand_timeout_secs == 0 {
            warnings.push("llm.expand_timeout_secs is 0: every expansion will time out".to_string());
        }
        if self.llm.generate_timeout_secs == 0 {
            warnings
                .push("llm.generate_timeout_secs is 0: every generation will time out".to_string());
        }
        if self.llm.default_model.trim().is_empty() {
            warnings.push("llm.default_model is empty".to_string());
        }
        if self.llm.expansion_model.trim().is_empty() {
            warnings.push("llm.expansion_model is empty".to_string());
        }
        if self.llm.base_url.trim().is_empty() {
            warnings.push("llm.base_url is empty".to_string());
        }
        warnings
    }
}

/// Effective configuration: the file merged with environment overrides.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub config_path: PathBuf,
    pub toml: VibecodeToml,
    /// Server-side OpenRouter key. Never logged.
    pub api_key: Option<String>,
    pub free_mode: bool,
    pub port: u16,
    pub db_path: PathBuf,
    pub dev_mode: bool,
}

impl StudioConfig {
    /// Load `path` (or the default location) and apply the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let toml = VibecodeToml::load_or_default(&config_path)?;
        Ok(Self::from_toml(config_path, toml, |k| std::env::var(k).ok()))
    }

    /// Merge `toml` with values looked up through `env`.
    pub fn from_toml(
        config_path: PathBuf,
        toml: VibecodeToml,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |k: &str| env(k).filter(|v| !v.trim().is_empty());

        let api_key = non_empty(&toml.llm.api_key_env).or_else(|| non_empty(FALLBACK_KEY_ENV));
        let free_mode = match non_empty("FREE_MODE") {
            Some(v) => v.eq_ignore_ascii_case("true") || v == "1",
            None => toml.generation.free_mode,
        };
        let port = non_empty("VIBECODE_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(toml.server.port);

        Self {
            config_path,
            api_key,
            free_mode,
            port,
            db_path: PathBuf::from(&toml.server.db_path),
            dev_mode: toml.server.dev_mode,
            toml,
        }
    }

    pub fn expand_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.llm.expand_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.llm.generate_timeout_secs)
    }

    pub fn default_model(&self) -> &str {
        &self.toml.llm.default_model
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        if self.api_key.is_none() {
            warnings.push(format!(
                "No server API key: set {} (or {}) in the environment or .env",
                self.toml.llm.api_key_env, FALLBACK_KEY_ENV
            ));
        }
        warnings
    }
}
