//! Messages exchanged with the text generator, and sanitising of inbound chat.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MAX_MESSAGES: usize = 60;
pub const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat message as a client sent it. Anything goes until sanitised.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

/// Normalise a client conversation: non-empty, bounded length, roles other
/// than `assistant` coerced to `user`, contents clipped.
pub fn sanitize_conversation(messages: Vec<InboundMessage>) -> Result<Vec<ChatMessage>> {
    if messages.is_empty() {
        return Err(Error::InvalidInput("messages are required".to_string()));
    }
    if messages.len() > MAX_MESSAGES {
        return Err(Error::InvalidInput(format!(
            "conversation too long: {} messages, at most {MAX_MESSAGES}",
            messages.len()
        )));
    }

    Ok(messages
        .into_iter()
        .map(|m| {
            let role = match m.role.as_deref() {
                Some("assistant") => Role::Assistant,
                _ => Role::User,
            };
            let content = match m.content {
                None | Some(serde_json::Value::Null) => String::new(),
                Some(serde_json::Value::String(s)) => s,
                Some(other) => other.to_string(),
            };
            ChatMessage {
                role,
                content: content.chars().take(MAX_CONTENT_CHARS).collect(),
            }
        })
        .collect())
}

/// One call to the text generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn single(system: String, prompt: String, max_tokens: u32) -> Self {
        Self {
            system,
            messages: vec![ChatMessage::user(prompt)],
            max_tokens,
        }
    }
}
