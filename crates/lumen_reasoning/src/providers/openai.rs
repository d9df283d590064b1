use super::ollama::{build_chat_payload, parse_chat_completion};
use crate::backend::{check_status, excerpt, transport_error, Backend, BackendError};
use anyhow::Result;
use async_trait::async_trait;
use lumen_core::config::BackendConfig;
use reqwest::Client;
use serde_json::Value;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client,
    name: String,
    /// `None` when `OPENAI_API_KEY` is unset; every call then fails over.
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let base_url = config
            .base_url
            .clone()
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
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

    pub fn without_api_key(mut self) -> Self {
        self.api_key = None;
        self
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, prompt), fields(backend = %self.name, model = %self.model))]
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, BackendError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::unavailable(&self.name, "OPENAI_API_KEY is not set"))?;

        let payload = build_chat_payload(&self.model, prompt, self.max_tokens, self.temperature);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, e, timeout))?;
        let response = check_status(&self.name, response).await?;

        let resp_text = response
            .text()
            .await
            .map_err(|e| transport_error(&self.name, e, timeout))?;
        tracing::debug!("{} raw response: {}", self.name, excerpt(&resp_text, 2000));
        let resp_json: Value = serde_json::from_str(&resp_text)
            .map_err(|e| BackendError::malformed(&self.name, format!("invalid JSON body: {}", e)))?;
        parse_chat_completion(&self.name, &resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::config::BackendKind;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(base_url: &str) -> OpenAiBackend {
        OpenAiBackend::new(&BackendConfig {
            name: "cloud".into(),
            kind: BackendKind::OpenAi,
            model: "gpt-4o-mini".into(),
            base_url: Some(base_url.to_string()),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = backend(&server.uri())
            .without_api_key()
            .generate("hi", Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            BackendError::Unavailable { reason, .. } => assert!(reason.contains("OPENAI_API_KEY")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}]
            })))
            .mount(&server)
            .await;

        let text = backend(&server.uri())
            .with_api_key("sk-test")
            .generate("hi", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_rejected_key_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = backend(&server.uri())
            .with_api_key("sk-bad")
            .generate("hi", Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            BackendError::Unavailable { reason, .. } => assert!(reason.contains("authentication")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
