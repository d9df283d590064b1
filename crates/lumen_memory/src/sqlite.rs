use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use lumen_core::{
    EmotionLabel, EntryId, Followup, GenerationStatus, JournalEntry, JournalRepository, NewEntry,
    Safety,
};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;

/// Journal entries in a single SQLite table.
///
/// Timestamps are stored as fixed-width RFC 3339 text (microseconds, `Z`) so
/// that lexical order equals chronological order.
#[derive(Clone)]
pub struct SqliteJournal {
    pool: Pool<Sqlite>,
}

impl SqliteJournal {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let journal = Self { pool };
        journal.migrate().await?;
        Ok(journal)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                text TEXT NOT NULL,
                sentiment REAL NOT NULL,
                emotion TEXT NOT NULL,
                safety TEXT NOT NULL,
                reflection TEXT NOT NULL,
                summary TEXT NOT NULL,
                followups TEXT NOT NULL,
                tone TEXT NOT NULL,
                generation TEXT NOT NULL,
                raw_response TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create entries table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_timestamp ON entries(timestamp)")
            .execute(&self.pool)
            .await
            .context("Failed to create entries timestamp index")?;

        Ok(())
    }

    /// Number of stored entries.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM entries")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count entries")?;
        Ok(row.get("n"))
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<JournalEntry> {
        let id: i64 = row.get("id");
        let timestamp: String = row.get("timestamp");
        let emotion: String = row.get("emotion");
        let safety: String = row.get("safety");
        let followups: String = row.get("followups");
        let generation: String = row.get("generation");

        Ok(JournalEntry {
            id: EntryId(id),
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .with_context(|| format!("Entry {}: bad timestamp '{}'", id, timestamp))?
                .with_timezone(&Utc),
            text: row.get("text"),
            sentiment: row.get::<f64, _>("sentiment") as f32,
            emotion: emotion
                .parse::<EmotionLabel>()
                .map_err(|e| anyhow::anyhow!("Entry {}: {}", id, e))?,
            safety: Safety::from_db_str(&safety)
                .ok_or_else(|| anyhow::anyhow!("Entry {}: unknown safety '{}'", id, safety))?,
            reflection: row.get("reflection"),
            summary: row.get("summary"),
            followups: serde_json::from_str::<Vec<Followup>>(&followups)
                .with_context(|| format!("Entry {}: bad followups JSON", id))?,
            tone: row.get("tone"),
            generation: generation
                .parse::<GenerationStatus>()
                .map_err(|e| anyhow::anyhow!("Entry {}: {}", id, e))?,
            raw_response: row.get("raw_response"),
        })
    }
}

#[async_trait]
impl JournalRepository for SqliteJournal {
    async fn append(&self, entry: &NewEntry) -> Result<EntryId> {
        entry.check().context("Refusing to store invalid entry")?;
        let followups =
            serde_json::to_string(&entry.followups).context("Failed to serialize followups")?;

        let result = sqlx::query(
            r#"
            INSERT INTO entries (timestamp, text, sentiment, emotion, safety, reflection, summary, followups, tone, generation, raw_response)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
        .bind(&entry.text)
        .bind(entry.sentiment as f64)
        .bind(entry.emotion.as_str())
        .bind(entry.safety.to_db_string())
        .bind(&entry.reflection)
        .bind(&entry.summary)
        .bind(followups)
        .bind(&entry.tone)
        .bind(entry.generation.as_str())
        .bind(&entry.raw_response)
        .execute(&self.pool)
        .await
        .context("Failed to insert entry")?;

        let id = EntryId(result.last_insert_rowid());
        tracing::debug!("Stored journal entry {}", id);
        Ok(id)
    }

    async fn load_all(&self) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, text, sentiment, emotion, safety, reflection, summary, followups, tone, generation, raw_response
            FROM entries ORDER BY timestamp ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }
}
