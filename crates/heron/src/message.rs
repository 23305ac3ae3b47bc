use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::GatewayError;

/// Sender of a chat message. Turn order in a conversation is significant and
/// is preserved all the way through prompt formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Capitalized form used in the provider-uniform prompt format.
    pub fn capitalized(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation. Assistant messages may carry the
/// reasoning content that was split off their visible answer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            thinking: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_show_thinking() -> bool {
    true
}

/// A chat generation request as received on the wire.
///
/// `temperature` and `max_tokens` are validated with [`ChatRequest::validate`]
/// before the request is allowed anywhere near a provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Provider name, e.g. "ollama" or "huggingface".
    pub provider: String,
    pub model_id: String,
    pub messages: Vec<Message>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub stream: bool,
    #[serde(default = "default_show_thinking")]
    pub show_thinking: bool,
}

impl ChatRequest {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(GatewayError::Validation {
                field: "temperature",
                message: format!("must be between 0.0 and 1.0, got {}", self.temperature),
            });
        }
        if self.max_tokens == 0 {
            return Err(GatewayError::Validation {
                field: "max_tokens",
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(temperature: f32, max_tokens: u32) -> ChatRequest {
        ChatRequest {
            provider: "ollama".to_string(),
            model_id: "llama3:latest".to_string(),
            messages: vec![Message::user("hi")],
            temperature,
            max_tokens,
            stream: false,
            show_thinking: true,
        }
    }

    #[test]
    fn accepts_in_range_parameters() {
        assert!(request(0.0, 1).validate().is_ok());
        assert!(request(1.0, 1024).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let err = request(1.5, 1024).validate().unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Validation {
                field: "temperature",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_max_tokens() {
        let err = request(0.7, 0).validate().unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Validation {
                field: "max_tokens",
                ..
            }
        ));
    }

    #[test]
    fn deserializes_with_defaults() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"provider": "ollama", "model_id": "m", "messages": [{"role": "user", "content": "hi"}]}"#,
        )
        .unwrap();
        assert_eq!(req.temperature, 0.7);
        assert_eq!(req.max_tokens, 1024);
        assert!(!req.stream);
        assert!(req.show_thinking);
    }
}
