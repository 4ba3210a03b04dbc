//! Cheap-model generator implementations for Hearth.
//!
//! All generators implement the `hearth_core::CheapGenerator` trait.
//! [`build_from_config`] picks the endpoint from configuration.

pub mod openai_compat;
pub mod prompts;

pub use openai_compat::OpenAiCompatGenerator;

use hearth_config::CheapModelConfig;
use hearth_core::CheapGenerator;
use hearth_core::error::GenerationError;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default base URL for a known provider name.
pub fn default_base_url(provider: &str) -> Option<&'static str> {
    match provider {
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "openai" => Some("https://api.openai.com/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        _ => None,
    }
}

/// Build the cheap generator from configuration.
///
/// Returns `Ok(None)` when no API key is available for a hosted provider,
/// which disables background housekeeping rather than failing startup.
pub fn build_from_config(
    config: &CheapModelConfig,
) -> Result<Option<Arc<dyn CheapGenerator>>, GenerationError> {
    let base_url = match (&config.api_url, default_base_url(&config.provider)) {
        (Some(url), _) => url.clone(),
        (None, Some(url)) => url.to_string(),
        (None, None) => {
            return Err(GenerationError::NotConfigured(format!(
                "cheap_model.api_url is required for provider '{}'",
                config.provider
            )));
        }
    };

    let api_key = match (&config.api_key, config.provider.as_str()) {
        (Some(key), _) => key.clone(),
        (None, "ollama") => "ollama".to_string(),
        (None, _) => {
            info!(provider = %config.provider, "No API key for cheap model, housekeeping disabled");
            return Ok(None);
        }
    };

    let generator = OpenAiCompatGenerator::new(
        config.provider.clone(),
        base_url,
        api_key,
        config.model.clone(),
        Duration::from_secs(config.timeout_secs),
    )?
    .with_sampling(config.max_tokens, config.temperature);

    Ok(Some(Arc::new(generator)))
}
