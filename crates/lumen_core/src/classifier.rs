//! Emotion/sentiment classification.
//!
//! Two independent stages. The polarity score always comes from
//! [`sentiment::polarity`]. The categorical label comes from one source, fixed
//! when the classifier is built:
//!
//! - **Threshold**: the polarity is binned into five coarse labels.
//! - **Zero-shot**: a [`LabelScorer`] rates the text against each label in
//!   [`EmotionLabel::ZERO_SHOT`]; the best score wins, earlier labels win ties.

use crate::config::{ClassifierConfig, LabelSource, ScorerKind};
use crate::journal::EmotionLabel;
use crate::sentiment;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    /// Polarity in `[-1.0, 1.0]`.
    pub sentiment: f32,
    pub emotion: EmotionLabel,
}

/// Rates how well `text` fits each candidate label.
///
/// Implementors:
/// - `CueScorer`: per-label cue words, no model
/// - `EmbeddingScorer`: sentence embeddings (feature `embeddings`)
pub trait LabelScorer: Send + Sync {
    /// One score per label, in the same order as `labels`. Higher is better.
    fn score(&self, text: &str, labels: &[EmotionLabel]) -> Result<Vec<f32>>;

    /// Scorer name (for logs)
    fn name(&self) -> &str;
}

enum LabelStrategy {
    Threshold {
        mild: f32,
        strong: f32,
    },
    /// `mild`/`strong` bin the polarity when the scorer fails.
    ZeroShot {
        scorer: Box<dyn LabelScorer>,
        mild: f32,
        strong: f32,
    },
}

pub struct EmotionClassifier {
    strategy: LabelStrategy,
}

impl EmotionClassifier {
    pub fn threshold(mild: f32, strong: f32) -> Self {
        Self {
            strategy: LabelStrategy::Threshold { mild, strong },
        }
    }

    pub fn zero_shot(scorer: Box<dyn LabelScorer>) -> Self {
        let defaults = ClassifierConfig::default();
        Self::zero_shot_with_thresholds(scorer, defaults.mild, defaults.strong)
    }

    pub fn zero_shot_with_thresholds(scorer: Box<dyn LabelScorer>, mild: f32, strong: f32) -> Self {
        Self {
            strategy: LabelStrategy::ZeroShot {
                scorer,
                mild,
                strong,
            },
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        match config.source {
            LabelSource::Threshold => Ok(Self::threshold(config.mild, config.strong)),
            LabelSource::ZeroShot => {
                let scorer: Box<dyn LabelScorer> = match config.scorer {
                    ScorerKind::Cues => Box::new(CueScorer),
                    ScorerKind::Embedding => build_embedding_scorer()?,
                };
                tracing::info!("Zero-shot emotion labels via {} scorer", scorer.name());
                Ok(Self::zero_shot_with_thresholds(scorer, config.mild, config.strong))
            }
        }
    }

    /// Polarity plus label. A failing zero-shot scorer degrades to the
    /// threshold label rather than failing the entry.
    pub fn classify(&self, text: &str) -> Result<Classification> {
        let sentiment = sentiment::polarity(text);
        let emotion = match &self.strategy {
            LabelStrategy::Threshold { mild, strong } => bin_polarity(sentiment, *mild, *strong),
            LabelStrategy::ZeroShot {
                scorer,
                mild,
                strong,
            } => match zero_shot_label(scorer.as_ref(), text) {
                Ok(label) => label,
                Err(e) => {
                    tracing::warn!(
                        "{} scorer failed, using threshold label: {:#}",
                        scorer.name(),
                        e
                    );
                    bin_polarity(sentiment, *mild, *strong)
                }
            },
        };
        Ok(Classification { sentiment, emotion })
    }
}

fn zero_shot_label(scorer: &dyn LabelScorer, text: &str) -> Result<EmotionLabel> {
    let labels = EmotionLabel::ZERO_SHOT;
    let scores = scorer.score(text, &labels)?;
    if scores.len() != labels.len() {
        anyhow::bail!(
            "{} scorer returned {} scores for {} labels",
            scorer.name(),
            scores.len(),
            labels.len()
        );
    }
    Ok(select_label(&labels, &scores))
}

#[cfg(feature = "embeddings")]
fn build_embedding_scorer() -> Result<Box<dyn LabelScorer>> {
    Ok(Box::new(EmbeddingScorer::new()?))
}

#[cfg(not(feature = "embeddings"))]
fn build_embedding_scorer() -> Result<Box<dyn LabelScorer>> {
    anyhow::bail!("Embedding scorer requires building with the `embeddings` feature")
}

/// Map a polarity score onto the five coarse labels.
pub fn bin_polarity(polarity: f32, mild: f32, strong: f32) -> EmotionLabel {
    if polarity >= strong {
        EmotionLabel::StronglyPositive
    } else if polarity > mild {
        EmotionLabel::Positive
    } else if polarity <= -strong {
        EmotionLabel::StronglyNegative
    } else if polarity < -mild {
        EmotionLabel::Negative
    } else {
        EmotionLabel::Neutral
    }
}

/// Highest score wins; on a tie the earlier label is kept. NaN never wins.
pub fn select_label(labels: &[EmotionLabel], scores: &[f32]) -> EmotionLabel {
    let mut best: Option<(EmotionLabel, f32)> = None;
    for (label, score) in labels.iter().zip(scores) {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if *score <= top => {}
            _ => best = Some((*label, *score)),
        }
    }
    best.map(|(l, _)| l).unwrap_or(EmotionLabel::Neutral)
}

// ============================================================================
// CueScorer
// ============================================================================

const CUES: &[(EmotionLabel, &[&str])] = &[
    (
        EmotionLabel::Joy,
        &[
            "happy", "glad", "joy", "excited", "delighted", "cheerful", "fun", "great",
            "wonderful", "smile", "smiled", "laughed", "proud", "enjoy", "enjoyed",
        ],
    ),
    (
        EmotionLabel::Sadness,
        &[
            "sad", "lonely", "alone", "cry", "crying", "cried", "tears", "miss", "grief",
            "hopeless", "empty", "depressed", "hurt", "heartbroken",
        ],
    ),
    (
        EmotionLabel::Anger,
        &[
            "angry", "mad", "furious", "hate", "annoyed", "frustrated", "irritated", "rage",
            "resent", "unfair",
        ],
    ),
    (
        EmotionLabel::Fear,
        &[
            "afraid", "scared", "anxious", "anxiety", "worried", "nervous", "panic", "fear",
            "terrified", "dread", "overwhelmed",
        ],
    ),
    (
        EmotionLabel::Surprise,
        &[
            "surprised", "unexpected", "shocked", "suddenly", "amazed", "wow", "astonished",
        ],
    ),
    (
        EmotionLabel::Love,
        &[
            "love", "loved", "adore", "caring", "affection", "cherish", "hug", "together",
            "grateful",
        ],
    ),
];

/// Baseline weight for `neutral`, so cue-free text lands there.
const NEUTRAL_PRIOR: f32 = 0.5;

/// Counts cue-word hits per label and normalises them into a distribution.
pub struct CueScorer;

impl LabelScorer for CueScorer {
    fn score(&self, text: &str, labels: &[EmotionLabel]) -> Result<Vec<f32>> {
        let words = sentiment::words(text);
        let raw: Vec<f32> = labels
            .iter()
            .map(|label| {
                if *label == EmotionLabel::Neutral {
                    return NEUTRAL_PRIOR;
                }
                CUES.iter()
                    .find(|(l, _)| l == label)
                    .map(|(_, cues)| words.iter().filter(|w| cues.contains(&w.as_str())).count() as f32)
                    .unwrap_or(0.0)
            })
            .collect();

        let total: f32 = raw.iter().sum();
        if total == 0.0 {
            return Ok(raw);
        }
        Ok(raw.into_iter().map(|s| s / total).collect())
    }

    fn name(&self) -> &str {
        "cues"
    }
}

// ============================================================================
// EmbeddingScorer
// ============================================================================

#[cfg(feature = "embeddings")]
pub use embedding_scorer::EmbeddingScorer;

#[cfg(feature = "embeddings")]
mod embedding_scorer {
    use super::LabelScorer;
    use crate::embedding::{cosine_similarity, Embedding, EmbeddingModel};
    use crate::journal::EmotionLabel;
    use anyhow::Result;

    /// Zero-shot by entailment proxy: cosine between the text and one
    /// hypothesis sentence per label.
    pub struct EmbeddingScorer {
        model: EmbeddingModel,
        hypotheses: Vec<(EmotionLabel, Embedding)>,
    }

    impl EmbeddingScorer {
        pub fn new() -> Result<Self> {
            let model = EmbeddingModel::new()?;
            let labels = EmotionLabel::ZERO_SHOT;
            let sentences: Vec<String> = labels
                .iter()
                .map(|l| format!("passage: This journal entry expresses {}.", l.as_str()))
                .collect();
            let embeddings = model.embed_batch(sentences)?;
            let hypotheses = labels.iter().copied().zip(embeddings).collect();
            Ok(Self { model, hypotheses })
        }
    }

    impl LabelScorer for EmbeddingScorer {
        fn score(&self, text: &str, labels: &[EmotionLabel]) -> Result<Vec<f32>> {
            let query = self.model.embed(&format!("query: {}", text))?;
            labels
                .iter()
                .map(|label| {
                    self.hypotheses
                        .iter()
                        .find(|(l, _)| l == label)
                        .map(|(_, h)| cosine_similarity(&query, h))
                        .ok_or_else(|| anyhow::anyhow!("No hypothesis for label {}", label))
                })
                .collect()
        }

        fn name(&self) -> &str {
            "embedding"
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
