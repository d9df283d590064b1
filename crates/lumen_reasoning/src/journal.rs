//! Journal service: the submission pipeline.
//!
//! detect crisis → classify → generate or skip → persist → retrieve similar

use crate::orchestrator::{
    Generation, ReflectionError, ReflectionOrchestrator, ReflectionRequest, ReflectionResult,
};
use chrono::Utc;
use lumen_core::config::{AnalyticsConfig, RetrievalConfig};
use lumen_core::crisis::CrisisConfigError;
use lumen_core::{
    CrisisAssessment, CrisisDetector, CrisisResource, EmotionClassifier, GenerationStatus,
    JournalEntry, JournalRepository, LumenConfig, NewEntry, Safety,
};
use lumen_memory::{find_similar, similarity, PatternReport};
use std::sync::Arc;

pub const CRISIS_REFLECTION: &str = "Crisis detected.";
pub const CRISIS_SUMMARY: &str = "Safety notice issued.";
pub const CRISIS_TONE: &str = "alert";

const UNSTRUCTURED_REFLECTION: &str =
    "No structured reflection could be generated. The raw response is saved with this entry.";

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("entry text is empty")]
    EmptyInput,

    #[error("crisis detector cannot run: {0}")]
    CrisisConfig(#[from] CrisisConfigError),

    #[error("classification failed: {0:#}")]
    Classification(anyhow::Error),

    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

/// Everything produced for one submitted entry.
#[derive(Debug, Clone)]
pub struct Submission {
    pub entry: JournalEntry,
    pub crisis: CrisisAssessment,
    /// `None` when generation was skipped for a crisis.
    pub generation: Option<Generation>,
    /// Past entries most similar to this one, best first.
    pub similar: Vec<(JournalEntry, f32)>,
    /// Non-empty only when a crisis was detected.
    pub resources: Vec<CrisisResource>,
}

pub struct JournalService {
    detector: CrisisDetector,
    classifier: EmotionClassifier,
    orchestrator: ReflectionOrchestrator,
    repository: Arc<dyn JournalRepository>,
    retrieval: RetrievalConfig,
    analytics: AnalyticsConfig,
}

impl JournalService {
    /// Build the analysis components from `config` around an existing
    /// orchestrator and repository.
    pub fn new(
        config: &LumenConfig,
        orchestrator: ReflectionOrchestrator,
        repository: Arc<dyn JournalRepository>,
    ) -> anyhow::Result<Self> {
        let detector = CrisisDetector::new(&config.crisis).map_err(JournalError::from)?;
        let classifier = EmotionClassifier::from_config(&config.classifier)?;
        tracing::info!(
            "Journal service ready: {} crisis term(s), backends [{}]",
            detector.term_count(),
            orchestrator.backend_names().join(", ")
        );
        Ok(Self {
            detector,
            classifier,
            orchestrator,
            repository,
            retrieval: config.retrieval.clone(),
            analytics: config.analytics.clone(),
        })
    }

    pub fn from_config(config: &LumenConfig, repository: Arc<dyn JournalRepository>) -> anyhow::Result<Self> {
        let orchestrator = ReflectionOrchestrator::from_config(config)?;
        Self::new(config, orchestrator, repository)
    }

    /// Replace the classifier built from config.
    pub fn with_classifier(mut self, classifier: EmotionClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn crisis_resources(&self) -> &[CrisisResource] {
        self.detector.resources()
    }

    /// Analyze, reflect on, and store one entry.
    #[tracing::instrument(skip(self, text), fields(len = text.len()))]
    pub async fn submit(&self, text: &str) -> Result<Submission, JournalError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(JournalError::EmptyInput);
        }

        let crisis = self.detector.detect(text);
        let analysis = self
            .classifier
            .classify(text)
            .map_err(JournalError::Classification)?;
        let history = self.history().await?;

        let mut entry = NewEntry {
            timestamp: Utc::now(),
            text: text.to_string(),
            sentiment: analysis.sentiment,
            emotion: analysis.emotion,
            safety: Safety::None,
            reflection: String::new(),
            summary: String::new(),
            followups: Vec::new(),
            tone: String::new(),
            generation: GenerationStatus::Skipped,
            raw_response: None,
        };

        let generation = if crisis.is_crisis() {
            entry.safety = Safety::Crisis(crisis.severity);
            entry.reflection = CRISIS_REFLECTION.to_string();
            entry.summary = CRISIS_SUMMARY.to_string();
            entry.tone = CRISIS_TONE.to_string();
            None
        } else {
            let context = history
                .iter()
                .rev()
                .take(self.retrieval.context_window)
                .rev()
                .map(|e| e.text.clone())
                .collect();
            let request = ReflectionRequest::new(text)
                .with_analysis(analysis.emotion, analysis.sentiment)
                .with_context(context);
            let generation = self
                .orchestrator
                .generate(&request)
                .await
                .map_err(|e| match e {
                    ReflectionError::EmptyInput => JournalError::EmptyInput,
                })?;
            apply_result(&mut entry, &generation.result);
            Some(generation)
        };

        let id = self
            .repository
            .append(&entry)
            .await
            .map_err(JournalError::Storage)?;
        let entry = entry.into_entry(id);

        let matches = find_similar(text, &history, self.retrieval.top_k);
        let similar = similarity::resolve(&matches, &history)
            .into_iter()
            .map(|(e, score)| (e.clone(), score))
            .collect();

        let resources = if crisis.is_crisis() {
            self.detector.resources().to_vec()
        } else {
            Vec::new()
        };

        tracing::info!(
            "Stored entry {} (emotion={}, sentiment={:.2}, safety={}, generation={})",
            entry.id,
            entry.emotion,
            entry.sentiment,
            entry.safety,
            entry.generation.as_str()
        );

        Ok(Submission {
            entry,
            crisis,
            generation,
            similar,
            resources,
        })
    }

    /// All stored entries, oldest first.
    pub async fn history(&self) -> Result<Vec<JournalEntry>, JournalError> {
        let mut history = self.repository.load_all().await.map_err(JournalError::Storage)?;
        history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(history)
    }

    /// Rank stored entries against `text` without storing anything.
    pub async fn similar_to(&self, text: &str) -> Result<Vec<(JournalEntry, f32)>, JournalError> {
        if text.trim().is_empty() {
            return Err(JournalError::EmptyInput);
        }
        let history = self.history().await?;
        let matches = find_similar(text, &history, self.retrieval.top_k);
        Ok(similarity::resolve(&matches, &history)
            .into_iter()
            .map(|(e, score)| (e.clone(), score))
            .collect())
    }

    pub async fn patterns(&self) -> Result<PatternReport, JournalError> {
        let history = self.history().await?;
        Ok(PatternReport::build(&history, &self.analytics))
    }
}

/// Copy a generation result onto the entry being built.
fn apply_result(entry: &mut NewEntry, result: &ReflectionResult) {
    match result {
        ReflectionResult::Success(r) => {
            entry.reflection = r.reflection.clone();
            entry.summary = r.summary.clone();
            entry.tone = r.tone.clone();
            entry.generation = GenerationStatus::Generated;
            if r.safety_flag {
                tracing::warn!("Backend raised its safety flag; follow-ups withheld");
                entry.safety = Safety::Flagged;
                entry.followups.clear();
            } else {
                entry.followups = r.followups.clone();
            }
        }
        ReflectionResult::Unstructured { raw_text, .. } => {
            entry.reflection = UNSTRUCTURED_REFLECTION.to_string();
            entry.generation = GenerationStatus::Unstructured;
            entry.raw_response = Some(raw_text.clone());
        }
        ReflectionResult::Failure { reason } => {
            entry.reflection = format!("Reflection unavailable: {}.", reason);
            entry.generation = GenerationStatus::Failed;
        }
    }
}
