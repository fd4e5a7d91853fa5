//! Text generation through the Anthropic Messages API.

use async_trait::async_trait;
use serde_json::json;

use blank_core::{GenerationRequest, Role};

use crate::config::GeneratorConfig;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no API key configured (set ANTHROPIC_API_KEY)")]
    MissingApiKey,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("provider rate limit exceeded")]
    RateLimited,

    #[error("provider rejected the request ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unreadable response: {0}")]
    Parse(String),
}

impl From<GenerationError> for blank_core::Error {
    fn from(e: GenerationError) -> Self {
        blank_core::Error::GenerationFailed(e.to_string())
    }
}

/// Prompt in, text out. Implementations must not retry.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

pub struct AnthropicGenerator {
    config: GeneratorConfig,
    client: reqwest::Client,
}

impl AnthropicGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn payload(&self, request: &GenerationRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": if m.role == Role::Assistant { "assistant" } else { "user" },
                    "content": m.content,
                })
            })
            .collect();

        json!({
            "model": self.config.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "messages": messages,
        })
    }
}

/// Concatenate the text blocks of a Messages API response.
fn extract_text(data: &serde_json::Value) -> Result<String, GenerationError> {
    let content = data
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| GenerationError::Parse("no content array in response".to_string()))?;

    let mut text = String::new();
    for block in content {
        if let Some(t) = block.get("text").and_then(|t| t.as_str()) {
            text.push_str(t);
        }
    }
    Ok(text.trim().to_string())
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingApiKey)?;

        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        tracing::debug!(model = %self.config.model, max_tokens = request.max_tokens, "generating");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => GenerationError::AuthenticationFailed(body),
                429 => GenerationError::RateLimited,
                code => GenerationError::Api { status: code, body },
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;
        extract_text(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blank_core::ChatMessage;

    fn generator() -> AnthropicGenerator {
        AnthropicGenerator::new(GeneratorConfig {
            api_key: None,
            ..GeneratorConfig::default()
        })
    }

    #[test]
    fn test_payload_shape() {
        let req = GenerationRequest {
            system: "sys".into(),
            messages: vec![
                ChatMessage::user("hi"),
                ChatMessage {
                    role: Role::Assistant,
                    content: "hello".into(),
                },
            ],
            max_tokens: 300,
        };
        let p = generator().payload(&req);
        assert_eq!(p["system"], "sys");
        assert_eq!(p["max_tokens"], 300);
        assert_eq!(p["messages"][1]["role"], "assistant");
        assert_eq!(p["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_extract_text_joins_blocks() {
        let data = json!({"content": [{"type": "text", "text": " a"}, {"type": "text", "text": "b "}]});
        assert_eq!(extract_text(&data).unwrap(), "ab");
        assert!(extract_text(&json!({"error": "x"})).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let req = GenerationRequest::single("s".into(), "p".into(), 10);
        let err = generator().generate(&req).await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey));
        let core: blank_core::Error = err.into();
        assert!(matches!(core, blank_core::Error::GenerationFailed(_)));
    }
}
