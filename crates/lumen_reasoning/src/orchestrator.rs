//! Reflection orchestrator: one prompt, an ordered chain of backends.
//!
//! Each backend is called at most once, under its own timeout. The first
//! one whose output parses into a schema-valid reflection wins. When none
//! does, the caller still gets a typed result: the raw text of the
//! highest-priority backend that produced any (`Unstructured`), or a
//! `Failure` when nothing came back at all.

use crate::backend::{build_backends, BackendError, BackendSlot};
use crate::normalizer::{extract_structured, parse_reflection};
use crate::prompts::reflection_prompt;
use lumen_core::{EmotionLabel, Followup, LumenConfig};
use serde::Serialize;
use std::time::{Duration, Instant};

// ============================================================================
// Request / result types
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReflectionRequest {
    pub text: String,
    pub emotion: Option<EmotionLabel>,
    pub sentiment: Option<f32>,
    /// Prior entry texts, oldest first.
    pub context: Vec<String>,
}

impl ReflectionRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_analysis(mut self, emotion: EmotionLabel, sentiment: f32) -> Self {
        self.emotion = Some(emotion);
        self.sentiment = Some(sentiment);
        self
    }

    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }
}

/// A schema-valid reflection. Always carries exactly two follow-ups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reflection {
    pub reflection: String,
    pub summary: String,
    pub followups: Vec<Followup>,
    pub tone: String,
    pub safety_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("all {attempts} backend(s) failed without producing text")]
    AllBackendsExhausted { attempts: usize },
    #[error("no backends are configured")]
    NoBackendsConfigured,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReflectionResult {
    Success(Reflection),
    /// Some backend answered, but no answer parsed into a reflection.
    Unstructured { backend: String, raw_text: String },
    Failure { reason: FailureReason },
}

impl ReflectionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ReflectionResult::Success(_))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReflectionError {
    #[error("entry text is empty")]
    EmptyInput,
}

/// One call in the fallback chain.
#[derive(Debug, Clone)]
pub struct BackendAttempt {
    pub backend: String,
    pub elapsed: Duration,
    /// `None` when this backend produced the winning reflection.
    pub error: Option<BackendError>,
}

impl BackendAttempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A result plus the ordered log of backends that were called for it.
#[derive(Debug, Clone)]
pub struct Generation {
    pub result: ReflectionResult,
    pub attempts: Vec<BackendAttempt>,
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct ReflectionOrchestrator {
    backends: Vec<BackendSlot>,
}

impl ReflectionOrchestrator {
    /// `backends` are tried in the order given.
    pub fn new(backends: Vec<BackendSlot>) -> Self {
        Self { backends }
    }

    pub fn from_config(config: &LumenConfig) -> anyhow::Result<Self> {
        Ok(Self::new(build_backends(config)?))
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|s| s.backend.name()).collect()
    }

    pub async fn generate_reflection(
        &self,
        request: &ReflectionRequest,
    ) -> Result<ReflectionResult, ReflectionError> {
        Ok(self.generate(request).await?.result)
    }

    /// Like `generate_reflection`, also returning the attempt log.
    #[tracing::instrument(skip(self, request), fields(backends = self.backends.len()))]
    pub async fn generate(&self, request: &ReflectionRequest) -> Result<Generation, ReflectionError> {
        if request.text.trim().is_empty() {
            return Err(ReflectionError::EmptyInput);
        }
        if self.backends.is_empty() {
            tracing::warn!("Reflection requested but no backends are configured");
            return Ok(Generation {
                result: ReflectionResult::Failure {
                    reason: FailureReason::NoBackendsConfigured,
                },
                attempts: Vec::new(),
            });
        }

        let prompt = reflection_prompt(request);
        let mut attempts = Vec::with_capacity(self.backends.len());
        let mut first_text: Option<(String, String)> = None;

        for slot in &self.backends {
            let name = slot.backend.name().to_string();
            let started = Instant::now();

            // Adapters enforce the timeout themselves; this bounds any that don't.
            let outcome =
                match tokio::time::timeout(slot.timeout, slot.backend.generate(&prompt, slot.timeout))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(BackendError::Timeout {
                        backend: name.clone(),
                        after: slot.timeout,
                    }),
                };

            let error = match outcome {
                Ok(text) => match interpret(&name, &text) {
                    Ok(reflection) => {
                        tracing::info!(
                            "Reflection from '{}' after {} failed attempt(s) ({:.1}s)",
                            name,
                            attempts.len(),
                            started.elapsed().as_secs_f64()
                        );
                        attempts.push(BackendAttempt {
                            backend: name,
                            elapsed: started.elapsed(),
                            error: None,
                        });
                        return Ok(Generation {
                            result: ReflectionResult::Success(reflection),
                            attempts,
                        });
                    }
                    Err(e) => {
                        if first_text.is_none() {
                            first_text = Some((name.clone(), text));
                        }
                        e
                    }
                },
                Err(e) => e,
            };

            tracing::warn!("Backend '{}' failed, falling back: {}", name, error);
            attempts.push(BackendAttempt {
                backend: name,
                elapsed: started.elapsed(),
                error: Some(error),
            });
        }

        let result = match first_text {
            Some((backend, raw_text)) => {
                tracing::warn!("No structured reflection; keeping raw output of '{}'", backend);
                ReflectionResult::Unstructured { backend, raw_text }
            }
            None => {
                tracing::warn!("All {} backend(s) exhausted", attempts.len());
                ReflectionResult::Failure {
                    reason: FailureReason::AllBackendsExhausted {
                        attempts: attempts.len(),
                    },
                }
            }
        };
        Ok(Generation { result, attempts })
    }
}

fn interpret(backend: &str, text: &str) -> Result<Reflection, BackendError> {
    let obj = extract_structured(text)
        .ok_or_else(|| BackendError::malformed(backend, "no JSON object found"))?;
    parse_reflection(backend, &obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Fixed(&'static str, Result<&'static str, ()>);

    #[async_trait]
    impl Backend for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, BackendError> {
            self.1
                .map(str::to_string)
                .map_err(|_| BackendError::unavailable(self.0, "down"))
        }
    }

    struct Hanging;

    #[async_trait]
    impl Backend for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, BackendError> {
            // Ignores its timeout on purpose
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    const GOOD: &str = r#"{"reflection": "r", "summary": "s", "followups": [{"question": "a", "follow_up": "b"}, {"question": "c", "follow_up": "d"}], "tone": "t", "safety_flag": false}"#;

    fn slot(b: impl Backend + 'static) -> BackendSlot {
        BackendSlot::new(Arc::new(b), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let orch = ReflectionOrchestrator::new(vec![slot(Fixed("a", Ok(GOOD)))]);
        assert_eq!(
            orch.generate_reflection(&ReflectionRequest::new("  \n")).await,
            Err(ReflectionError::EmptyInput)
        );
    }

    #[tokio::test]
    async fn test_no_backends_is_failure() {
        let orch = ReflectionOrchestrator::new(vec![]);
        let result = orch.generate_reflection(&ReflectionRequest::new("hi")).await.unwrap();
        assert_eq!(
            result,
            ReflectionResult::Failure {
                reason: FailureReason::NoBackendsConfigured
            }
        );
    }

    #[tokio::test]
    async fn test_falls_back_past_unavailable_and_malformed() {
        let orch = ReflectionOrchestrator::new(vec![
            slot(Fixed("down", Err(()))),
            slot(Fixed("chatty", Ok("I think you feel fine."))),
            slot(Fixed("good", Ok(GOOD))),
        ]);
        let gen = orch.generate(&ReflectionRequest::new("hi")).await.unwrap();
        assert!(gen.result.is_success());
        let names: Vec<&str> = gen.attempts.iter().map(|a| a.backend.as_str()).collect();
        assert_eq!(names, vec!["down", "chatty", "good"]);
        assert!(gen.attempts[2].succeeded());
        assert!(!gen.attempts[0].succeeded());
    }

    #[tokio::test]
    async fn test_unstructured_keeps_first_text() {
        let orch = ReflectionOrchestrator::new(vec![
            slot(Fixed("down", Err(()))),
            slot(Fixed("first", Ok("plain answer one"))),
            slot(Fixed("second", Ok("{\"reflection\": \"only\"}"))),
        ]);
        let result = orch.generate_reflection(&ReflectionRequest::new("hi")).await.unwrap();
        assert_eq!(
            result,
            ReflectionResult::Unstructured {
                backend: "first".into(),
                raw_text: "plain answer one".into()
            }
        );
    }

    #[tokio::test]
    async fn test_all_unavailable_is_exhausted() {
        let orch = ReflectionOrchestrator::new(vec![
            slot(Fixed("a", Err(()))),
            slot(Fixed("b", Err(()))),
        ]);
        let result = orch.generate_reflection(&ReflectionRequest::new("hi")).await.unwrap();
        assert_eq!(
            result,
            ReflectionResult::Failure {
                reason: FailureReason::AllBackendsExhausted { attempts: 2 }
            }
        );
    }

    #[tokio::test]
    async fn test_hanging_backend_is_cut_off() {
        let orch = ReflectionOrchestrator::new(vec![
            BackendSlot::new(Arc::new(Hanging), Duration::from_millis(50)),
            slot(Fixed("good", Ok(GOOD))),
        ]);
        let gen = orch.generate(&ReflectionRequest::new("hi")).await.unwrap();
        assert!(gen.result.is_success());
        assert!(matches!(
            gen.attempts[0].error,
            Some(BackendError::Timeout { .. })
        ));
    }

    #[test]
    fn test_result_serializes_with_status_tag() {
        let v = serde_json::to_value(ReflectionResult::Failure {
            reason: FailureReason::NoBackendsConfigured,
        })
        .unwrap();
        assert_eq!(v["status"], "failure");
        assert_eq!(v["reason"]["kind"], "no_backends_configured");
    }
}
