//! Mock backend: deterministic output for offline runs and demos.

use crate::backend::{Backend, BackendError};
use async_trait::async_trait;
use lumen_core::config::BackendConfig;
use std::time::Duration;

const CANNED_REFLECTION: &str = r#"{
  "reflection": "It sounds like a lot has been on your mind, and you are taking time to notice it.",
  "summary": "Taking stock of the day.",
  "followups": [
    {"question": "What stood out most to you today?", "follow_up": "Helps name the main theme."},
    {"question": "What would make tomorrow a little easier?", "follow_up": "Turns reflection into a small next step."}
  ],
  "tone": "warm",
  "safety_flag": false
}"#;

#[derive(Debug, Clone)]
pub struct MockBackend {
    name: String,
    response: String,
}

impl MockBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            name: config.label().to_string(),
            response: config
                .mock_response
                .clone()
                .unwrap_or_else(|| CANNED_REFLECTION.to_string()),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, BackendError> {
        if self.response.trim().is_empty() {
            return Err(BackendError::malformed(&self.name, "empty output"));
        }
        Ok(self.response.clone())
    }
}
