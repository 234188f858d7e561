//! Completion bridge: sends a two-message exchange (system + user) to an
//! OpenAI-compatible chat-completions endpoint and returns the first
//! generated reply. Supports mock (deterministic, no network) and live modes.
//!
//! API key: `SAATHI_LLM_API_KEY` or `OPENROUTER_API_KEY` in `.env`. Default
//! model: `openai/gpt-4` via OpenRouter.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENV_LLM_API_URL: &str = "SAATHI_LLM_API_URL";
const ENV_LLM_API_KEY: &str = "SAATHI_LLM_API_KEY";
const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
const ENV_LLM_MODEL: &str = "SAATHI_LLM_MODEL";
const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "openai/gpt-4";

/// Mode for LLM invocation: mock (returns a deterministic canned reply) or
/// live (calls the external API).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    #[default]
    Mock,
    Live,
}

impl LlmMode {
    /// Maps the configured `llm_mode` string: `"live"` selects the real API,
    /// anything else stays mock.
    pub fn from_mode_str(mode: &str) -> Self {
        match mode {
            "live" => LlmMode::Live,
            _ => LlmMode::Mock,
        }
    }
}

// OpenAI-compatible request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Boundary call to the external text-generation service. Constructed once
/// at startup and shared by reference into request handlers.
pub struct CompletionService {
    mode: LlmMode,
    client: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
}

impl CompletionService {
    /// Creates a service in the given mode with a 60-second request timeout.
    pub fn new(mode: LlmMode) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            mode,
            client,
            api_url: None,
            api_key: None,
            model: None,
        }
    }

    /// Overrides the completions endpoint (default: OpenRouter, or
    /// `SAATHI_LLM_API_URL`).
    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = Some(url.to_string());
        self
    }

    /// Overrides the API key (default: `SAATHI_LLM_API_KEY` or
    /// `OPENROUTER_API_KEY` from the environment).
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.trim().to_string());
        self
    }

    /// Overrides the model identifier (e.g. `openai/gpt-4`,
    /// `anthropic/claude-3.5-sonnet`).
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    fn resolve_api_key(&self) -> CoreResult<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(ENV_LLM_API_KEY).ok())
            .or_else(|| std::env::var(ENV_OPENROUTER_API_KEY).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                CoreError::GenerationFailed(format!(
                    "missing {ENV_LLM_API_KEY} or {ENV_OPENROUTER_API_KEY}"
                ))
            })
    }

    /// Deterministic mock generation: same input, same reply. Keeps the
    /// relay fully exercisable without network access or credentials.
    fn mock_complete(&self, user_text: &str) -> String {
        format!("[Generated - Mock LLM] {}", user_text.trim())
    }

    /// Submits the two-turn exchange (system instruction, then the user's
    /// message) and returns the first candidate reply's text. Every failure
    /// mode (transport, non-2xx status, malformed body, empty choices)
    /// surfaces as `GenerationFailed`; there are no retries.
    pub async fn complete(&self, system_text: &str, user_text: &str) -> CoreResult<String> {
        if self.mode == LlmMode::Mock {
            return Ok(self.mock_complete(user_text));
        }

        let url = self
            .api_url
            .clone()
            .or_else(|| std::env::var(ENV_LLM_API_URL).ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let key = self.resolve_api_key()?;
        let model = self
            .model
            .clone()
            .or_else(|| std::env::var(ENV_LLM_MODEL).ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        tracing::debug!(target: "saathi::completion", model = %model, "dispatching completion request");

        let body = ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_text.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", key))
            .header("HTTP-Referer", "https://saathi.local")
            .header("X-Title", "Saathi-Backend")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::GenerationFailed(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(CoreError::GenerationFailed(format!(
                "completion API error ({status}): {detail}"
            )));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            CoreError::GenerationFailed(format!("completion response parse failed: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                CoreError::GenerationFailed("completion response contained no choices".to_string())
            })
    }
}
