//! Journal data model.
//!
//! Entries are written once and never edited. A `NewEntry` is what the
//! pipeline hands to a repository; the repository assigns the `EntryId` and
//! hands back `JournalEntry` values on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers and labels
// ============================================================================

/// Repository-assigned entry id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Categorical emotion vocabulary.
///
/// The first five labels are the coarse polarity bins; the remaining ones are
/// the zero-shot vocabulary. Declaration order is the canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    StronglyPositive,
    Positive,
    Neutral,
    Negative,
    StronglyNegative,
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Love,
}

impl EmotionLabel {
    /// Closed label set for zero-shot classification, in precedence order.
    /// Ties between equally scored labels go to the earlier one.
    pub const ZERO_SHOT: [EmotionLabel; 7] = [
        EmotionLabel::Joy,
        EmotionLabel::Sadness,
        EmotionLabel::Anger,
        EmotionLabel::Fear,
        EmotionLabel::Surprise,
        EmotionLabel::Love,
        EmotionLabel::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::StronglyPositive => "strongly_positive",
            EmotionLabel::Positive => "positive",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Negative => "negative",
            EmotionLabel::StronglyNegative => "strongly_negative",
            EmotionLabel::Joy => "joy",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Anger => "anger",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Love => "love",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strongly_positive" => Ok(EmotionLabel::StronglyPositive),
            "positive" => Ok(EmotionLabel::Positive),
            "neutral" => Ok(EmotionLabel::Neutral),
            "negative" => Ok(EmotionLabel::Negative),
            "strongly_negative" => Ok(EmotionLabel::StronglyNegative),
            "joy" => Ok(EmotionLabel::Joy),
            "sadness" => Ok(EmotionLabel::Sadness),
            "anger" => Ok(EmotionLabel::Anger),
            "fear" => Ok(EmotionLabel::Fear),
            "surprise" => Ok(EmotionLabel::Surprise),
            "love" => Ok(EmotionLabel::Love),
            other => Err(format!("unknown emotion label '{}'", other)),
        }
    }
}

// ============================================================================
// Safety
// ============================================================================

/// Graded crisis severity. Ordered: `None < Moderate < Severe`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Moderate,
    Severe,
}

impl Severity {
    pub fn is_crisis(&self) -> bool {
        *self > Severity::None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

/// Safety state recorded on an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Safety {
    #[default]
    None,
    /// The generation backend raised its own safety flag.
    Flagged,
    /// The crisis detector matched; generation was skipped.
    Crisis(Severity),
}

impl Safety {
    pub fn is_none(&self) -> bool {
        matches!(self, Safety::None)
    }

    /// Compact text form used for storage: `none`, `flagged`, `crisis:<severity>`.
    pub fn to_db_string(&self) -> String {
        match self {
            Safety::None => "none".to_string(),
            Safety::Flagged => "flagged".to_string(),
            Safety::Crisis(sev) => format!("crisis:{}", sev.as_str()),
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Safety::None),
            "flagged" => Some(Safety::Flagged),
            "crisis:moderate" => Some(Safety::Crisis(Severity::Moderate)),
            "crisis:severe" => Some(Safety::Crisis(Severity::Severe)),
            _ => None,
        }
    }
}

impl fmt::Display for Safety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_db_string())
    }
}

// ============================================================================
// Entries
// ============================================================================

/// A supportive follow-up question and why it is worth asking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Followup {
    pub question: String,
    #[serde(alias = "follow_up")]
    pub rationale: String,
}

/// How the reflection on an entry came to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    #[default]
    Generated,
    /// A backend answered but no structured reflection could be parsed.
    Unstructured,
    /// No backend produced any text.
    Failed,
    /// Generation was never attempted (crisis short-circuit).
    Skipped,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Generated => "generated",
            GenerationStatus::Unstructured => "unstructured",
            GenerationStatus::Failed => "failed",
            GenerationStatus::Skipped => "skipped",
        }
    }
}

impl FromStr for GenerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(GenerationStatus::Generated),
            "unstructured" => Ok(GenerationStatus::Unstructured),
            "failed" => Ok(GenerationStatus::Failed),
            "skipped" => Ok(GenerationStatus::Skipped),
            other => Err(format!("unknown generation status '{}'", other)),
        }
    }
}

/// An entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub sentiment: f32,
    pub emotion: EmotionLabel,
    pub safety: Safety,
    pub reflection: String,
    pub summary: String,
    pub followups: Vec<Followup>,
    pub tone: String,
    pub generation: GenerationStatus,
    pub raw_response: Option<String>,
}

/// Reasons a `NewEntry` is refused at the repository boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntryError {
    #[error("entry text is empty")]
    EmptyText,
    #[error("sentiment {0} is outside [-1, 1]")]
    SentimentOutOfRange(f32),
    #[error("entry with safety '{0}' must not carry follow-ups")]
    FollowupsOnUnsafeEntry(Safety),
    #[error("generated entry must carry exactly 2 follow-ups, found {0}")]
    FollowupCount(usize),
}

impl NewEntry {
    /// Check the invariants every stored entry must satisfy.
    pub fn check(&self) -> Result<(), EntryError> {
        if self.text.trim().is_empty() {
            return Err(EntryError::EmptyText);
        }
        if !(-1.0..=1.0).contains(&self.sentiment) {
            return Err(EntryError::SentimentOutOfRange(self.sentiment));
        }
        if !self.safety.is_none() && !self.followups.is_empty() {
            return Err(EntryError::FollowupsOnUnsafeEntry(self.safety));
        }
        if self.safety.is_none()
            && self.generation == GenerationStatus::Generated
            && self.followups.len() != 2
        {
            return Err(EntryError::FollowupCount(self.followups.len()));
        }
        Ok(())
    }

    pub fn into_entry(self, id: EntryId) -> JournalEntry {
        JournalEntry {
            id,
            timestamp: self.timestamp,
            text: self.text,
            sentiment: self.sentiment,
            emotion: self.emotion,
            safety: self.safety,
            reflection: self.reflection,
            summary: self.summary,
            followups: self.followups,
            tone: self.tone,
            generation: self.generation,
            raw_response: self.raw_response,
        }
    }
}

/// A stored, immutable journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub sentiment: f32,
    pub emotion: EmotionLabel,
    pub safety: Safety,
    pub reflection: String,
    pub summary: String,
    pub followups: Vec<Followup>,
    pub tone: String,
    pub generation: GenerationStatus,
    pub raw_response: Option<String>,
}

/// A past entry ranked against a query. Holds the id only; resolve it
/// against the history it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub entry_id: EntryId,
    /// Cosine similarity in `[0, 1]`.
    pub score: f32,
}
