//! Text generators for Quill.
//!
//! [`ChatCompletionsClient`] speaks the OpenAI chat-completions protocol,
//! which most hosted and local inference servers expose. Point it at a
//! server with `QUILL_BASE_URL` and pick a model with `QUILL_MODEL`.
//!
//! ```rust,ignore
//! use quill_models::ChatCompletionsClient;
//! use quill_interface::RoleRegistry;
//! use std::sync::Arc;
//!
//! let client = Arc::new(ChatCompletionsClient::from_env()?);
//! let registry = RoleRegistry::new().with_default(client);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod dto;
mod prompts;

pub use client::{
    API_KEY_VAR, BASE_URL_VAR, ChatCompletionsClient, MODEL_VAR, ModelSettings,
    ModelSettingsBuilder,
};
pub use dto::{
    ChatChoice, ChatMessage, ChatMessageBuilder, ChatRequest, ChatRequestBuilder, ChatResponse,
    ChatRole, ChatUsage, ChoiceMessage,
};
pub use prompts::system_prompt;
