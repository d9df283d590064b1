//! Local generation through the `ollama` command-line client.
//!
//! Runs `ollama run <model>` with the prompt on stdin and reads the
//! completion from stdout. The child is killed if the timeout fires.

use crate::backend::{excerpt, Backend, BackendError};
use async_trait::async_trait;
use lumen_core::config::BackendConfig;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct OllamaCliBackend {
    name: String,
    program: String,
    args: Vec<String>,
}

impl OllamaCliBackend {
    pub fn new(config: &BackendConfig) -> Self {
        let program = std::env::var("OLLAMA_BIN").unwrap_or_else(|_| "ollama".to_string());
        Self {
            name: config.label().to_string(),
            program,
            args: vec!["run".to_string(), config.model.clone()],
        }
    }

    /// Run an arbitrary command instead of `ollama run`.
    pub fn with_command(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Backend for OllamaCliBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, prompt), fields(backend = %self.name))]
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, BackendError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BackendError::unavailable(&self.name, format!("cannot start '{}': {}", self.program, e))
            })?;

        let stdin = child.stdin.take();
        let run = async move {
            if let Some(mut stdin) = stdin {
                // The child may exit without reading; its exit status says why.
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    tracing::debug!("Writing prompt to child stdin failed: {}", e);
                }
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(timeout, run).await {
            Ok(res) => res.map_err(|e| {
                BackendError::unavailable(&self.name, format!("process error: {}", e))
            })?,
            Err(_) => {
                return Err(BackendError::Timeout {
                    backend: self.name.clone(),
                    after: timeout,
                })
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(BackendError::unavailable(
                &self.name,
                format!("exited with {}: {}", output.status, excerpt(stderr.trim(), 200)),
            ));
        } else if !stderr.trim().is_empty() {
            tracing::debug!("{} stderr (success): {}", self.name, excerpt(stderr.trim(), 200));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(BackendError::malformed(&self.name, "empty output"));
        }
        Ok(text)
    }
}
