//! Configuration management for SQL Explorer.
//!
//! Handles loading configuration from TOML files, with sections for the LLM
//! provider, the session workspace and the chat capability.

use crate::error::{ExplorerError, Result};
use crate::llm::LlmProvider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for SQL Explorer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Session workspace configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Chat capability configuration.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "openai", "anthropic" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name. Falls back to the provider's default when unset.
    #[serde(default)]
    pub model: Option<String>,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Parses the configured provider name.
    pub fn provider(&self) -> Result<LlmProvider> {
        self.provider
            .parse::<LlmProvider>()
            .map_err(ExplorerError::config)
    }

    /// Returns the configured model, or the provider's default model.
    pub fn resolved_model(&self) -> Result<String> {
        match &self.model {
            Some(model) if !model.trim().is_empty() => Ok(model.clone()),
            _ => Ok(self.provider()?.default_model().to_string()),
        }
    }
}

/// Session workspace configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory uploaded files are written to.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Maximum rows materialized for a single query result.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_rows() -> usize {
    10_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            max_rows: default_max_rows(),
        }
    }
}

/// Chat capability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Whether natural-language questions are answered.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether generated SQL may modify the database.
    #[serde(default)]
    pub allow_writes: bool,

    /// Number of most recent transcript entries sent as context.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_true() -> bool {
    true
}

fn default_history_limit() -> usize {
    10
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_writes: false,
            history_limit: default_history_limit(),
        }
    }
}

impl Config {
    /// Returns the directory holding the config file and `secrets.toml`.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sql-explorer")
    }

    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        Self::default_dir().join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ExplorerError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            ExplorerError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.llm.provider()?;
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ExplorerError::config(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.session.max_rows == 0 {
            return Err(ExplorerError::config("session.max_rows must be positive"));
        }
        Ok(())
    }
}
