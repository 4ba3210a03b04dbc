//! Configuration loading, validation, and management for Hearth.
//!
//! Loads configuration from `~/.hearth/config.toml` with environment
//! variable overrides. Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.hearth/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider of the conversational model (drives budget lookup)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Conversational model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Context assembly settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Background summarization settings
    #[serde(default)]
    pub summarization: SummarizationConfig,

    /// Background title maintenance settings
    #[serde(default)]
    pub titles: TitleConfig,

    /// The cheap model used for summaries and titles
    #[serde(default)]
    pub cheap_model: CheapModelConfig,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum memory candidates requested from memory search
    #[serde(default = "default_memory_candidate_limit")]
    pub memory_candidate_limit: usize,

    /// Minimum importance forwarded to memory search
    #[serde(default)]
    pub min_importance: f32,

    /// Custom model profiles (override the built-in table)
    #[serde(default)]
    pub models: Vec<ModelProfileConfig>,
}

fn default_memory_candidate_limit() -> usize {
    10
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            memory_candidate_limit: default_memory_candidate_limit(),
            min_importance: 0.0,
            models: vec![],
        }
    }
}

/// A custom context-window entry for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProfileConfig {
    pub provider: String,
    pub model: String,
    pub context_limit: usize,

    /// Optional proportional split; the built-in split is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationConfig>,
}

/// Fractions of the context window per content source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub system: f32,
    pub memory: f32,
    pub summary: f32,
    pub recent: f32,
    pub reserve: f32,
}

impl AllocationConfig {
    pub fn sum(&self) -> f32 {
        self.system + self.memory + self.summary + self.recent + self.reserve
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Message count that must be exceeded before summarizing
    #[serde(default = "default_min_messages")]
    pub min_messages: usize,

    /// Conversation-to-window token ratio that must be exceeded
    #[serde(default = "default_token_ratio")]
    pub token_ratio: f32,

    /// New messages required since the last summary before re-evaluating
    #[serde(default = "default_recheck_interval")]
    pub recheck_interval: usize,

    /// Messages handed to an incremental summary update
    #[serde(default = "default_incremental_window")]
    pub incremental_window: usize,
}

fn default_min_messages() -> usize {
    20
}
fn default_token_ratio() -> f32 {
    0.5
}
fn default_recheck_interval() -> usize {
    10
}
fn default_incremental_window() -> usize {
    20
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_messages: default_min_messages(),
            token_ratio: default_token_ratio(),
            recheck_interval: default_recheck_interval(),
            incremental_window: default_incremental_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Messages shown to the cheap model when reconsidering a title
    #[serde(default = "default_title_recent_messages")]
    pub recent_messages: usize,
}

fn default_title_recent_messages() -> usize {
    10
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            recent_messages: default_title_recent_messages(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CheapModelConfig {
    #[serde(default = "default_cheap_provider")]
    pub provider: String,

    #[serde(default = "default_cheap_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible endpoint (provider default when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_cheap_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_cheap_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cheap_provider() -> String {
    "openrouter".into()
}
fn default_cheap_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_cheap_max_tokens() -> u32 {
    512
}
fn default_cheap_temperature() -> f32 {
    0.3
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for CheapModelConfig {
    fn default() -> Self {
        Self {
            provider: default_cheap_provider(),
            model: default_cheap_model(),
            api_url: None,
            api_key: None,
            max_tokens: default_cheap_max_tokens(),
            temperature: default_cheap_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for CheapModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheapModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.hearth/config.toml).
    ///
    /// Also checks environment variables for the cheap-model API key:
    /// - `HEARTH_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if self.cheap_model.api_key.is_none() {
            self.cheap_model.api_key = std::env::var("HEARTH_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("HEARTH_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("HEARTH_MODEL") {
            self.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".hearth")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.memory_candidate_limit == 0 {
            return Err(ConfigError::ValidationError(
                "context.memory_candidate_limit must be > 0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.context.min_importance) {
            return Err(ConfigError::ValidationError(
                "context.min_importance must be between 0.0 and 1.0".into(),
            ));
        }

        for profile in &self.context.models {
            if profile.context_limit == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "context window for {}/{} must be > 0",
                    profile.provider, profile.model
                )));
            }
            if let Some(alloc) = &profile.allocation {
                let parts = [alloc.system, alloc.memory, alloc.summary, alloc.recent, alloc.reserve];
                if parts.iter().any(|p| *p < 0.0) || alloc.sum() > 1.0 + f32::EPSILON {
                    return Err(ConfigError::ValidationError(format!(
                        "allocation for {}/{} must be non-negative and sum to at most 1.0",
                        profile.provider, profile.model
                    )));
                }
            }
        }

        let ratio = self.summarization.token_ratio;
        if ratio <= 0.0 || ratio > 1.0 {
            return Err(ConfigError::ValidationError(
                "summarization.token_ratio must be in (0.0, 1.0]".into(),
            ));
        }

        if self.summarization.incremental_window == 0 || self.titles.recent_messages == 0 {
            return Err(ConfigError::ValidationError(
                "message windows must be > 0".into(),
            ));
        }

        if self.cheap_model.temperature < 0.0 || self.cheap_model.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "cheap_model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        Ok(())
    }

    /// A copy safe to print: secrets replaced with a placeholder.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.cheap_model.api_key.is_some() {
            config.cheap_model.api_key = Some("[REDACTED]".into());
        }
        config
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            context: ContextConfig::default(),
            summarization: SummarizationConfig::default(),
            titles: TitleConfig::default(),
            cheap_model: CheapModelConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
