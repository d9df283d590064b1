use crate::backend::{check_status, excerpt, transport_error, Backend, BackendError};
use anyhow::Result;
use async_trait::async_trait;
use lumen_core::config::BackendConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    client: Client,
    name: String,
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let base_url = config
            .base_url
            .clone()
            .or_else(|| env::var("ANTHROPIC_BASE_URL").ok())
            .unwrap_or_else(|| "https://api.anthropic.com".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder().build()?,
            name: config.label().to_string(),
            api_key,
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }
}

/// Concatenated text blocks of a Messages API response.
fn parse_messages_response(backend: &str, resp_json: &Value) -> Result<String, BackendError> {
    let blocks = resp_json["content"]
        .as_array()
        .ok_or_else(|| BackendError::malformed(backend, "response has no content array"))?;
    let text = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim();
    if text.is_empty() {
        return Err(BackendError::malformed(backend, "no text content"));
    }
    Ok(text.to_string())
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, prompt), fields(backend = %self.name, model = %self.model))]
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, BackendError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::unavailable(&self.name, "ANTHROPIC_API_KEY is not set"))?;

        let url = format!("{}/v1/messages", self.base_url);
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, e, timeout))?;
        let response = check_status(&self.name, response).await?;

        let resp_text = response
            .text()
            .await
            .map_err(|e| transport_error(&self.name, e, timeout))?;
        tracing::debug!(
            "Anthropic raw response (first 2000 chars): {}",
            excerpt(&resp_text, 2000)
        );
        let resp_json: Value = serde_json::from_str(&resp_text)
            .map_err(|e| BackendError::malformed(&self.name, format!("invalid JSON body: {}", e)))?;
        parse_messages_response(&self.name, &resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::config::BackendKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_joins_text_blocks() {
        let resp = json!({
            "content": [
                {"type": "text", "text": "{\"a\":"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": " 1}"}
            ],
            "stop_reason": "end_turn"
        });
        assert_eq!(parse_messages_response("a", &resp).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_rejects_missing_content() {
        assert!(parse_messages_response("a", &json!({"type": "error"})).is_err());
    }

    #[tokio::test]
    async fn test_generate_sends_version_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "reflection text"}],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let backend = AnthropicBackend::new(&BackendConfig {
            name: "claude".into(),
            kind: BackendKind::Anthropic,
            model: "claude-3-5-haiku-latest".into(),
            base_url: Some(server.uri()),
            ..BackendConfig::default()
        })
        .unwrap()
        .with_api_key("test-key");

        let text = backend.generate("hi", Duration::from_secs(5)).await.unwrap();
        assert_eq!(text, "reflection text");
    }
}
