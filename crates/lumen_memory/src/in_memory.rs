use anyhow::{Context, Result};
use async_trait::async_trait;
use lumen_core::{EntryId, JournalEntry, JournalRepository, NewEntry};
use tokio::sync::RwLock;

/// Process-local journal. Ids start at 1 and follow insertion order.
#[derive(Default)]
pub struct InMemoryJournal {
    entries: RwLock<Vec<JournalEntry>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with already-stored entries, e.g. fixtures in tests.
    pub fn with_entries(entries: Vec<JournalEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl JournalRepository for InMemoryJournal {
    async fn append(&self, entry: &NewEntry) -> Result<EntryId> {
        entry.check().context("Refusing to store invalid entry")?;
        let mut entries = self.entries.write().await;
        let next = entries.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
        let id = EntryId(next);
        entries.push(entry.clone().into_entry(id));
        Ok(id)
    }

    async fn load_all(&self) -> Result<Vec<JournalEntry>> {
        let mut all = self.entries.read().await.clone();
        all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(all)
    }
}
