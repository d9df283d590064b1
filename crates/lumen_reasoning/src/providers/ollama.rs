//! Ollama over HTTP.
//!
//! Ollama exposes an OpenAI-compatible API at localhost:11434/v1,
//! so the chat payload and response parsing are shared with the OpenAI
//! provider.

use crate::backend::{check_status, excerpt, transport_error, Backend, BackendError};
use anyhow::Result;
use async_trait::async_trait;
use lumen_core::config::BackendConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: Client,
    name: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OllamaBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .or_else(|| env::var("OLLAMA_BASE_URL").ok())
            .unwrap_or_else(|| "http://localhost:11434/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder().build()?,
            name: config.label().to_string(),
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

/// Single-turn chat payload for OpenAI-compatible endpoints.
pub(crate) fn build_chat_payload(model: &str, prompt: &str, max_tokens: u32, temperature: f32) -> Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": prompt}],
        "temperature": temperature,
        "max_tokens": max_tokens,
        "stream": false,
    })
}

/// Text of the first choice in an OpenAI-compatible chat completion.
pub(crate) fn parse_chat_completion(backend: &str, resp_json: &Value) -> Result<String, BackendError> {
    let choice = &resp_json["choices"][0];
    if choice.is_null() {
        return Err(BackendError::malformed(backend, "response has no choices"));
    }
    let content = choice["message"]["content"].as_str().unwrap_or_default().trim();
    if content.is_empty() {
        let finish = choice["finish_reason"].as_str().unwrap_or("unknown");
        return Err(BackendError::malformed(
            backend,
            format!("empty completion (finish_reason={})", finish),
        ));
    }
    Ok(content.to_string())
}

#[async_trait]
impl Backend for OllamaBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, prompt), fields(backend = %self.name, model = %self.model))]
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, BackendError> {
        let payload = build_chat_payload(&self.model, prompt, self.max_tokens, self.temperature);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
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
