//! Backend implementations.
//!
//! - `ollama_cli`: local `ollama run` child process
//! - `ollama`: Ollama's OpenAI-compatible HTTP API
//! - `openai`: OpenAI chat completions
//! - `anthropic`: Anthropic Messages API
//! - `mock`: canned output

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod ollama_cli;
pub mod openai;
