//! SQLite-based vector store implementation.
//!
//! Metadata filters run in SQL; cosine distance is computed in Rust over the
//! filtered rows. Embeddings are stored as little-endian f32 blobs.

use super::{rank, Collection, Entry, Filter, Hit, VectorStore};
use crate::error::{PensumError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    content TEXT NOT NULL,
    course_title TEXT NOT NULL,
    lesson_number INTEGER,
    chunk_index INTEGER,
    payload TEXT,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL,
    UNIQUE (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_entries_course ON entries(collection, course_title);
"#;

const UPSERT: &str = r#"
INSERT INTO entries
(collection, id, content, course_title, lesson_number, chunk_index, payload, embedding, indexed_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT (collection, id) DO UPDATE SET
    content = excluded.content,
    course_title = excluded.course_title,
    lesson_number = excluded.lesson_number,
    chunk_index = excluded.chunk_index,
    payload = excluded.payload,
    embedding = excluded.embedding,
    indexed_at = excluded.indexed_at
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, content, course_title, lesson_number, chunk_index, payload, embedding, indexed_at FROM entries";

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets readers proceed during a course load.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn write_entry(conn: &Connection, collection: Collection, entry: &Entry) -> Result<()> {
        conn.execute(
            UPSERT,
            params![
                collection.as_str(),
                entry.id,
                entry.content,
                entry.course_title,
                entry.lesson_number,
                entry.chunk_index.map(|i| i as i64),
                entry.payload,
                Self::embedding_to_bytes(&entry.embedding),
                entry.indexed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn read_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
        let chunk_index: Option<i64> = row.get(4)?;
        let embedding_bytes: Vec<u8> = row.get(6)?;
        let indexed_at_str: String = row.get(7)?;

        Ok(Entry {
            id: row.get(0)?,
            content: row.get(1)?,
            course_title: row.get(2)?,
            lesson_number: row.get(3)?,
            chunk_index: chunk_index.map(|i| i as usize),
            payload: row.get(5)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, entry), fields(id = %entry.id))]
    async fn upsert(&self, collection: Collection, entry: &Entry) -> Result<()> {
        let conn = self.lock()?;
        Self::write_entry(&conn, collection, entry)?;
        debug!("Upserted {} entry {}", collection, entry.id);
        Ok(())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn upsert_batch(&self, collection: Collection, entries: &[Entry]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for entry in entries {
            Self::write_entry(&tx, collection, entry)?;
        }

        tx.commit()?;
        debug!("Batch upserted {} {} entries", entries.len(), collection);
        Ok(entries.len())
    }

    #[instrument(skip(self, embedding))]
    async fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        top_k: usize,
        filter: &Filter,
    ) -> Result<Vec<Hit>> {
        let conn = self.lock()?;

        let sql = format!(
            "{} WHERE collection = ?1 \
             AND (?2 IS NULL OR course_title = ?2) \
             AND (?3 IS NULL OR lesson_number = ?3) \
             ORDER BY seq",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let candidates = stmt
            .query_map(
                params![collection.as_str(), filter.course_title, filter.lesson_number],
                Self::read_entry,
            )?
            .collect::<rusqlite::Result<Vec<Entry>>>()?;

        let hits = rank(candidates, embedding, top_k);
        debug!("Found {} matching {} entries", hits.len(), collection);
        Ok(hits)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Entry>> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE collection = ?1 AND id = ?2", SELECT_COLUMNS);
        let entry = conn
            .query_row(&sql, params![collection.as_str(), id], Self::read_entry)
            .optional()?;
        Ok(entry)
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Entry>> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE collection = ?1 ORDER BY seq", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![collection.as_str()], Self::read_entry)?
            .collect::<rusqlite::Result<Vec<Entry>>>()?;
        Ok(entries)
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?1",
            params![collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn delete_by_course(&self, collection: Collection, course_title: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM entries WHERE collection = ?1 AND course_title = ?2",
            params![collection.as_str(), course_title],
        )?;

        debug!("Deleted {} {} entries for course '{}'", deleted, collection, course_title);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn clear(&self, collection: Collection) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM entries WHERE collection = ?1",
            params![collection.as_str()],
        )?;

        info!("Cleared {} entries from {}", deleted, collection);
        Ok(deleted)
    }
}
