pub mod analytics;
pub mod in_memory;
pub mod similarity;
pub mod sqlite;
pub mod tokenize;

pub use analytics::{PatternReport, SafetyBreakdown, SentimentSummary};
pub use in_memory::InMemoryJournal;
pub use similarity::{find_similar, TfIdfSpace, MIN_HISTORY};
pub use sqlite::SqliteJournal;
