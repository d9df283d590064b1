use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LumenConfig {
    pub backends: Vec<BackendConfig>,
    pub classifier: ClassifierConfig,
    pub crisis: CrisisConfig,
    pub retrieval: RetrievalConfig,
    pub analytics: AnalyticsConfig,
    pub storage: StorageConfig,
}

impl Default for LumenConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            classifier: ClassifierConfig::default(),
            crisis: CrisisConfig::default(),
            retrieval: RetrievalConfig::default(),
            analytics: AnalyticsConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl LumenConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: LumenConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from path; if the file doesn't exist, return defaults with env
    /// overrides. A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            let mut cfg = Self::default();
            cfg.apply_env_overrides();
            return Ok(cfg);
        }
        Self::load(path)
    }

    /// Enabled backends in fallback order: ascending priority, declaration
    /// order among equals.
    pub fn ordered_backends(&self) -> Vec<&BackendConfig> {
        let mut enabled: Vec<&BackendConfig> = self.backends.iter().filter(|b| b.enabled).collect();
        enabled.sort_by_key(|b| b.priority);
        enabled
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LUMEN_DB_PATH") {
            self.storage.db_path = v;
        }
        if let Ok(v) = std::env::var("LUMEN_BACKENDS") {
            self.restrict_backends(&v);
        }
        if let Ok(v) = std::env::var("LUMEN_BACKEND_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                for b in &mut self.backends {
                    b.timeout_secs = n;
                }
            }
        }
        if let Ok(v) = std::env::var("LUMEN_LABEL_SOURCE") {
            match v.as_str() {
                "threshold" => self.classifier.source = LabelSource::Threshold,
                "zero_shot" => self.classifier.source = LabelSource::ZeroShot,
                other => tracing::warn!("Ignoring unknown LUMEN_LABEL_SOURCE '{}'", other),
            }
        }
    }

    /// Keep only the named backends, in the order given.
    fn restrict_backends(&mut self, names: &str) {
        let wanted: Vec<&str> = names
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let mut kept = Vec::new();
        for (rank, name) in wanted.iter().enumerate() {
            match self.backends.iter().find(|b| b.label() == *name) {
                Some(b) => {
                    let mut b = b.clone();
                    b.priority = rank as i32;
                    kept.push(b);
                }
                None => tracing::warn!("LUMEN_BACKENDS names unknown backend '{}'", name),
            }
        }
        self.backends = kept;
    }
}

// ============================================================================
// Backends
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// `ollama run <model>` as a child process.
    OllamaCli,
    /// Ollama's OpenAI-compatible HTTP endpoint.
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    /// Canned response, for offline runs.
    Mock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OllamaCli => "ollama_cli",
            BackendKind::Ollama => "ollama",
            BackendKind::OpenAi => "openai",
            BackendKind::Anthropic => "anthropic",
            BackendKind::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Identifier used in logs and in `LUMEN_BACKENDS`. Defaults to the kind.
    pub name: String,
    pub kind: BackendKind,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Lower runs first.
    pub priority: i32,
    pub max_tokens: u32,
    pub temperature: f32,
    pub enabled: bool,
    /// Only read by `mock` backends.
    pub mock_response: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: BackendKind::OllamaCli,
            model: "gemma3:1b".to_string(),
            base_url: None,
            timeout_secs: 60,
            priority: 0,
            max_tokens: 1024,
            temperature: 0.7,
            enabled: true,
            mock_response: None,
        }
    }
}

impl BackendConfig {
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            self.kind.as_str()
        } else {
            &self.name
        }
    }
}

/// Local first, then cloud.
fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig {
            name: "local".to_string(),
            kind: BackendKind::OllamaCli,
            model: "gemma3:1b".to_string(),
            timeout_secs: 120,
            priority: 0,
            ..BackendConfig::default()
        },
        BackendConfig {
            name: "openai".to_string(),
            kind: BackendKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
            priority: 10,
            ..BackendConfig::default()
        },
    ]
}

// ============================================================================
// Analysis
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// Bin the polarity score into five coarse labels.
    #[default]
    Threshold,
    /// Pick the best fit from the closed emotion vocabulary.
    ZeroShot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    #[default]
    Cues,
    /// Requires the `embeddings` feature.
    Embedding,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub source: LabelSource,
    /// |polarity| above this leaves the neutral bin.
    pub mild: f32,
    /// |polarity| at or above this is a strong label.
    pub strong: f32,
    pub scorer: ScorerKind,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            source: LabelSource::Threshold,
            mild: 0.4,
            strong: 0.75,
            scorer: ScorerKind::Cues,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrisisConfig {
    pub severe: Vec<String>,
    pub moderate: Vec<String>,
    /// Region or category -> URL or hotline, shown verbatim on a crisis.
    pub resources: BTreeMap<String, String>,
}

impl Default for CrisisConfig {
    fn default() -> Self {
        Self {
            severe: default_severe_terms(),
            moderate: default_moderate_terms(),
            resources: BTreeMap::from([(
                "global".to_string(),
                "https://findahelpline.com".to_string(),
            )]),
        }
    }
}

fn default_severe_terms() -> Vec<String> {
    [
        "kill myself",
        "end my life",
        "end it all",
        "suicide",
        "suicidal",
        "want to die",
        "self harm",
        "self-harm",
        "hurt myself",
        "better off dead",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_moderate_terms() -> Vec<String> {
    [
        "hopeless",
        "can't go on",
        "cannot go on",
        "no reason to live",
        "worthless",
        "give up on everything",
        "nobody would care",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Prior entries passed to the backend as conversational context.
    pub context_window: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            context_window: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub low_sentiment_threshold: f32,
    pub top_terms: usize,
    pub recent_entries: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            low_sentiment_threshold: -0.1,
            top_terms: 10,
            recent_entries: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "lumen.db".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
