pub mod classifier;
pub mod config;
pub mod crisis;
pub mod embedding;
pub mod journal;
pub mod sentiment;

pub use classifier::{Classification, EmotionClassifier, LabelScorer};
pub use config::LumenConfig;
pub use crisis::{CrisisAssessment, CrisisDetector, CrisisResource};
pub use journal::{
    EmotionLabel, EntryId, Followup, GenerationStatus, JournalEntry, NewEntry, Safety, Severity,
    SimilarityMatch,
};

use async_trait::async_trait;

/// Append-only store of journal entries.
///
/// Implementors:
/// - `SqliteJournal`: durable, backed by a SQLite file
/// - `InMemoryJournal`: process-local, for tests and ephemeral sessions
///
/// `append` must be atomic with respect to `load_all`: a reader sees either
/// the snapshot before the append or the one after, never a partial entry.
#[async_trait]
pub trait JournalRepository: Send + Sync {
    /// Store a new entry and return the id assigned to it.
    async fn append(&self, entry: &NewEntry) -> anyhow::Result<EntryId>;

    /// Every stored entry, oldest first.
    async fn load_all(&self) -> anyhow::Result<Vec<JournalEntry>>;
}
