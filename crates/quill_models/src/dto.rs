//! Chat-completions wire types.

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions
    System,
    /// User turn
    User,
    /// Model turn
    Assistant,
}

/// One message in a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Builder, Getters)]
#[builder(setter(into))]
pub struct ChatMessage {
    /// Speaker
    role: ChatRole,
    /// Message text
    content: String,
}

impl ChatMessage {
    /// Creates a new builder for `ChatMessage`.
    pub fn builder() -> ChatMessageBuilder {
        ChatMessageBuilder::default()
    }

    /// System message shorthand.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message shorthand.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Request body for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize, Builder, Getters)]
#[builder(setter(into))]
pub struct ChatRequest {
    /// Model identifier
    model: String,
    /// Conversation so far
    messages: Vec<ChatMessage>,
    /// Sampling temperature
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum tokens to generate
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Creates a new builder for `ChatRequest`.
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }
}

/// Message returned inside a choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Getters)]
pub struct ChoiceMessage {
    /// Generated text, absent for tool-only answers
    #[serde(default)]
    content: Option<String>,
}

/// One candidate completion.
#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
pub struct ChatChoice {
    /// Candidate index
    #[serde(default)]
    index: u32,
    /// Generated message
    #[serde(default)]
    message: ChoiceMessage,
    /// Why generation stopped
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Token accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ChatUsage {
    /// Prompt tokens consumed
    #[serde(default)]
    prompt_tokens: u32,
    /// Completion tokens generated
    #[serde(default)]
    completion_tokens: u32,
}

/// Response body of a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
pub struct ChatResponse {
    /// Candidate completions
    #[serde(default)]
    choices: Vec<ChatChoice>,
    /// Token accounting, when reported
    #[serde(default)]
    usage: Option<ChatUsage>,
}

impl ChatResponse {
    /// Text of the first choice with non-blank content.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .iter()
            .filter_map(|choice| choice.message.content.as_deref())
            .find(|text| !text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_unset_options() {
        let request = ChatRequest::builder()
            .model("gpt-4o-mini")
            .messages(vec![ChatMessage::system("be brief"), ChatMessage::user("hi")])
            .build()
            .unwrap();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_first_text_skips_blank_choices() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [
                {"index": 0, "message": {"content": "  "}},
                {"index": 1, "message": {"content": null}},
                {"index": 2, "message": {"content": "Once upon a time"}, "finish_reason": "stop"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.first_text(), Some("Once upon a time"));
    }

    #[test]
    fn test_first_text_empty_response() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(response.first_text(), None);
        assert!(response.usage().is_none());
    }
}
