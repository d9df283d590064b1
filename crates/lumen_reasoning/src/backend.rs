//! Text-generation backend adapter.
//!
//! A backend turns a prompt into free text. Everything above this layer
//! (fallback order, parsing, persistence) is backend-agnostic.

use crate::providers::{
    anthropic::AnthropicBackend, mock::MockBackend, ollama::OllamaBackend,
    ollama_cli::OllamaCliBackend, openai::OpenAiBackend,
};
use anyhow::Result;
use async_trait::async_trait;
use lumen_core::config::{BackendConfig, BackendKind};
use lumen_core::LumenConfig;
use reqwest::{Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// Why a single backend call produced nothing usable. Every variant is
/// recoverable by moving on to the next backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// Process, network, or auth failure.
    #[error("backend '{backend}' unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("backend '{backend}' timed out after {after:?}")]
    Timeout { backend: String, after: Duration },

    /// Text came back but not in the expected shape.
    #[error("backend '{backend}' returned a malformed response: {reason}")]
    MalformedResponse { backend: String, reason: String },
}

impl BackendError {
    pub fn unavailable(backend: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(backend: &str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }

    pub fn backend(&self) -> &str {
        match self {
            Self::Unavailable { backend, .. }
            | Self::Timeout { backend, .. }
            | Self::MalformedResponse { backend, .. } => backend,
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Name used in logs and attempt records.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`, giving up after `timeout`.
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, BackendError>;
}

/// A backend together with its own time budget.
#[derive(Clone)]
pub struct BackendSlot {
    pub backend: Arc<dyn Backend>,
    pub timeout: Duration,
}

impl BackendSlot {
    pub fn new(backend: Arc<dyn Backend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }
}

/// Instantiate the enabled backends in fallback order.
pub fn build_backends(config: &LumenConfig) -> Result<Vec<BackendSlot>> {
    config
        .ordered_backends()
        .into_iter()
        .map(|b| {
            let backend = build_backend(b)?;
            tracing::info!(
                "Backend '{}' ({}, model={}, timeout={}s)",
                backend.name(),
                b.kind.as_str(),
                b.model,
                b.timeout_secs
            );
            Ok(BackendSlot::new(backend, Duration::from_secs(b.timeout_secs)))
        })
        .collect()
}

fn build_backend(config: &BackendConfig) -> Result<Arc<dyn Backend>> {
    Ok(match config.kind {
        BackendKind::OllamaCli => Arc::new(OllamaCliBackend::new(config)),
        BackendKind::Ollama => Arc::new(OllamaBackend::new(config)?),
        BackendKind::OpenAi => Arc::new(OpenAiBackend::new(config)?),
        BackendKind::Anthropic => Arc::new(AnthropicBackend::new(config)?),
        BackendKind::Mock => Arc::new(MockBackend::new(config)),
    })
}

// ============================================================================
// HTTP helpers shared by the providers
// ============================================================================

/// Statuses worth handing to the next backend rather than treating as a
/// configuration problem.
fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::INTERNAL_SERVER_ERROR
        || status == StatusCode::BAD_GATEWAY
        || status == StatusCode::SERVICE_UNAVAILABLE
        || status == StatusCode::GATEWAY_TIMEOUT
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Pass a successful response through; turn anything else into an error.
pub(crate) async fn check_status(backend: &str, response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body = excerpt(&body, 200);
    let reason = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        format!("authentication rejected ({}): {}", status, body)
    } else if is_transient_status(status) {
        format!("transient error ({}): {}", status, body)
    } else {
        format!("API error ({}): {}", status, body)
    };
    Err(BackendError::unavailable(backend, reason))
}

/// Map a transport error, distinguishing client-side timeouts.
pub(crate) fn transport_error(backend: &str, err: reqwest::Error, timeout: Duration) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout {
            backend: backend.to_string(),
            after: timeout,
        }
    } else {
        BackendError::unavailable(backend, format!("request failed: {}", err))
    }
}

/// At most `max` characters of `text`, for logs and error messages.
pub(crate) fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
        assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("ééééé", 2), "éé…");
    }

    #[test]
    fn test_error_carries_backend_name() {
        let e = BackendError::malformed("local", "no JSON object");
        assert_eq!(e.backend(), "local");
        assert!(e.to_string().contains("malformed"));
    }

    #[test]
    fn test_build_backends_follows_priority() {
        let mut config = LumenConfig::default();
        config.backends = vec![
            BackendConfig {
                name: "second".into(),
                kind: BackendKind::Mock,
                priority: 5,
                ..BackendConfig::default()
            },
            BackendConfig {
                name: "off".into(),
                kind: BackendKind::Mock,
                enabled: false,
                ..BackendConfig::default()
            },
            BackendConfig {
                name: "first".into(),
                kind: BackendKind::Mock,
                priority: 1,
                timeout_secs: 7,
                ..BackendConfig::default()
            },
        ];
        let slots = build_backends(&config).unwrap();
        let names: Vec<&str> = slots.iter().map(|s| s.backend.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(slots[0].timeout, Duration::from_secs(7));
    }
}
