//! OpenAI-compatible chat-completions client.

use crate::{ChatMessage, ChatRequest, ChatResponse, system_prompt};
use async_trait::async_trait;
use derive_builder::Builder;
use derive_getters::Getters;
use quill_core::Role;
use quill_error::{GenerationError, GenerationErrorKind, QuillResult};
use quill_interface::TextGenerator;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Environment variable holding the bearer token.
pub const API_KEY_VAR: &str = "QUILL_API_KEY";
/// Environment variable overriding the endpoint base URL.
pub const BASE_URL_VAR: &str = "QUILL_BASE_URL";
/// Environment variable overriding the model.
pub const MODEL_VAR: &str = "QUILL_MODEL";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for a chat-completions endpoint.
#[derive(Clone, Builder, Getters)]
#[builder(setter(into))]
pub struct ModelSettings {
    /// Bearer token
    api_key: String,
    /// Base URL, without the `/chat/completions` suffix
    #[builder(default = "DEFAULT_BASE_URL.to_string()")]
    base_url: String,
    /// Model identifier
    #[builder(default = "DEFAULT_MODEL.to_string()")]
    model: String,
    /// Sampling temperature
    #[builder(default)]
    temperature: Option<f32>,
    /// Maximum tokens per completion
    #[builder(default)]
    max_tokens: Option<u32>,
    /// Per-request timeout in seconds
    #[builder(default = "120")]
    timeout_secs: u64,
}

impl std::fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ModelSettings {
    /// Creates a new builder for `ModelSettings`.
    pub fn builder() -> ModelSettingsBuilder {
        ModelSettingsBuilder::default()
    }

    /// Read settings from `QUILL_API_KEY`, `QUILL_BASE_URL` and `QUILL_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` if `QUILL_API_KEY` is unset or blank.
    pub fn from_env() -> QuillResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> QuillResult<Self> {
        let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let api_key = present(API_KEY_VAR)
            .ok_or_else(|| GenerationError::new(GenerationErrorKind::MissingApiKey))?;

        Ok(Self {
            api_key,
            base_url: present(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: present(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: None,
            max_tokens: None,
            timeout_secs: 120,
        })
    }

    /// Full URL of the completions endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// [`TextGenerator`] backed by any OpenAI-compatible chat-completions API.
///
/// Every call is a fresh two-message conversation: the role's system prompt
/// and the caller's prompt.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    settings: ModelSettings,
}

impl ChatCompletionsClient {
    /// Creates a client from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    #[instrument(skip_all, fields(model = %settings.model))]
    pub fn new(settings: ModelSettings) -> QuillResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GenerationError::new(GenerationErrorKind::ClientCreation(e.to_string())))?;
        debug!(endpoint = %settings.endpoint(), "Created chat-completions client");
        Ok(Self { client, settings })
    }

    /// Creates a client configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not set or the HTTP client cannot
    /// be initialized.
    pub fn from_env() -> QuillResult<Self> {
        Self::new(ModelSettings::from_env()?)
    }

    /// Settings in use.
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Request body for `prompt` spoken to `role`.
    pub fn build_request(&self, role: Role, prompt: &str) -> QuillResult<ChatRequest> {
        ChatRequest::builder()
            .model(self.settings.model.clone())
            .messages(vec![
                ChatMessage::system(system_prompt(role)),
                ChatMessage::user(prompt),
            ])
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
            .build()
            .map_err(|e| GenerationError::new(GenerationErrorKind::Rejected(e.to_string())).into())
    }
}

/// Map a reqwest failure onto a generation error kind.
fn transport_error(error: reqwest::Error, timeout_secs: u64) -> GenerationError {
    if error.is_timeout() {
        GenerationError::new(GenerationErrorKind::Timeout(timeout_secs))
    } else {
        GenerationError::new(GenerationErrorKind::Transport(error.to_string()))
    }
}

/// Extract the completion text from a response body.
fn completion_text(response: &ChatResponse) -> Result<String, GenerationError> {
    response
        .first_text()
        .map(str::to_string)
        .ok_or_else(|| GenerationError::new(GenerationErrorKind::EmptyResponse))
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    #[instrument(
        skip(self, prompt),
        fields(provider = "openai", model = %self.settings.model, prompt_len = prompt.len())
    )]
    async fn generate(&self, role: Role, prompt: &str) -> QuillResult<String> {
        let request = self.build_request(role, prompt)?;
        let url = self.settings.endpoint();
        debug!(url = %url, "Sending chat-completions request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.settings.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::new(GenerationErrorKind::HttpError {
                status_code: status.as_u16(),
                message,
            })
            .into());
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, self.settings.timeout_secs))?;
        if let Some(usage) = body.usage() {
            debug!(
                prompt_tokens = usage.prompt_tokens(),
                completion_tokens = usage.completion_tokens(),
                "Chat completion usage"
            );
        }

        Ok(completion_text(&body)?)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}
