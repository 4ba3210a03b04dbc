//! OpenAI-compatible cheap generator.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! endpoint exposing `/chat/completions`. Each housekeeping task is
//! rendered to a system + user prompt pair and sent non-streaming.

use crate::prompts;
use async_trait::async_trait;
use hearth_core::error::GenerationError;
use hearth_core::{CheapGenerator, CheapTask, Generation, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout for cheap generation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A cheap generator backed by an OpenAI-compatible chat completions API.
pub struct OpenAiCompatGenerator {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatGenerator {
    /// Create a new generator.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 512,
            temperature: 0.3,
            client,
        })
    }

    /// Create an OpenRouter generator (convenience constructor).
    pub fn openrouter(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        Self::new(
            "openrouter",
            "https://openrouter.ai/api/v1",
            api_key,
            model,
            DEFAULT_TIMEOUT,
        )
    }

    /// Create an OpenAI generator (convenience constructor).
    pub fn openai(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            api_key,
            model,
            DEFAULT_TIMEOUT,
        )
    }

    /// Create an Ollama generator (convenience constructor).
    pub fn ollama(
        base_url: Option<&str>,
        model: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            model,
            DEFAULT_TIMEOUT,
        )
    }

    /// Override sampling parameters.
    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the request body for a task.
    fn request_body(&self, task: &CheapTask) -> ApiRequest {
        let prompt = prompts::render(task);
        ApiRequest {
            model: self.model.clone(),
            messages: vec![
                ApiMessage {
                    role: "system".into(),
                    content: Some(prompt.system.to_string()),
                },
                ApiMessage {
                    role: "user".into(),
                    content: Some(prompt.user),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        }
    }
}

/// Pull the text and usage out of a parsed completion.
fn into_generation(api_response: ApiResponse) -> Result<Generation, GenerationError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or(GenerationError::EmptyResponse)?;

    let text = choice.message.content.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(Generation { text, usage })
}

#[async_trait]
impl CheapGenerator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, task: CheapTask) -> Result<Generation, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&task);

        debug!(
            provider = %self.name,
            model = %self.model,
            task = task.kind(),
            "Sending cheap generation request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(GenerationError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(GenerationError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Cheap model returned error");
            return Err(GenerationError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| GenerationError::Api {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        into_generation(api_response)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openrouter_constructor() {
        let generator = OpenAiCompatGenerator::openrouter("sk-test", "openai/gpt-4o-mini").unwrap();
        assert_eq!(generator.name(), "openrouter");
        assert!(generator.base_url().contains("openrouter.ai"));
        assert_eq!(generator.model(), "openai/gpt-4o-mini");
    }

    #[test]
    fn ollama_constructor() {
        let generator = OpenAiCompatGenerator::ollama(None, "llama3").unwrap();
        assert_eq!(generator.name(), "ollama");
        assert!(generator.base_url().contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let generator =
            OpenAiCompatGenerator::new("custom", "http://host/v1/", "k", "m", DEFAULT_TIMEOUT)
                .unwrap();
        assert_eq!(generator.base_url(), "http://host/v1");
    }

    #[test]
    fn request_body_shape() {
        let generator = OpenAiCompatGenerator::openai("sk-test", "gpt-4o-mini")
            .unwrap()
            .with_sampling(128, 0.1);
        let body = generator.request_body(&CheapTask::TitleFromSummary {
            summary: "They met.".into(),
        });
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 128);
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(
            json["messages"][1]["content"]
                .as_str()
                .unwrap()
                .contains("They met.")
        );
    }

    #[test]
    fn parse_completion() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "A summary."}}],
            "usage": {"prompt_tokens": 40, "completion_tokens": 3, "total_tokens": 43}
        }"#;
        let response: ApiResponse = serde_json::from_str(raw).unwrap();
        let generation = into_generation(response).unwrap();
        assert_eq!(generation.text, "A summary.");
        assert_eq!(generation.usage.unwrap().total_tokens, 43);
    }

    #[test]
    fn empty_choices_is_empty_response() {
        let response: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            into_generation(response),
            Err(GenerationError::EmptyResponse)
        ));

        let response: ApiResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            into_generation(response),
            Err(GenerationError::EmptyResponse)
        ));
    }
}
