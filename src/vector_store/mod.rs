//! Vector store abstraction for Pensum.
//!
//! Every store holds two independent collections: one summary entry per
//! course (the catalog) and one entry per content chunk. Both are searched
//! by cosine distance against a query embedding.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::course::CourseChunk;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two logical collections of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// One entry per course, keyed by title.
    Catalog,
    /// One entry per chunk of lesson content.
    Content,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Catalog => "catalog",
            Collection::Content => "content",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry stored in one of the collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Key, unique within its collection.
    pub id: String,
    /// The embedded text.
    pub content: String,
    /// Owning course title.
    pub course_title: String,
    /// Lesson the content was cut from (content entries only).
    pub lesson_number: Option<u32>,
    /// Position in the course's chunk sequence (content entries only).
    pub chunk_index: Option<usize>,
    /// Opaque JSON payload (the full course for catalog entries).
    pub payload: Option<String>,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this entry was written.
    pub indexed_at: DateTime<Utc>,
}

impl Entry {
    /// Build a catalog entry for a course.
    pub fn summary(course_title: &str, payload: String, embedding: Vec<f32>) -> Self {
        Self {
            id: course_title.to_string(),
            content: course_title.to_string(),
            course_title: course_title.to_string(),
            lesson_number: None,
            chunk_index: None,
            payload: Some(payload),
            embedding,
            indexed_at: Utc::now(),
        }
    }

    /// Build a content entry for a chunk.
    pub fn chunk(chunk: &CourseChunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.storage_id(),
            content: chunk.text.clone(),
            course_title: chunk.course_title.clone(),
            lesson_number: chunk.lesson_number,
            chunk_index: Some(chunk.chunk_index),
            payload: None,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// Exact-match metadata filter. Present fields are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl Filter {
    /// A filter that matches everything.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn course(title: impl Into<String>) -> Self {
        Self {
            course_title: Some(title.into()),
            lesson_number: None,
        }
    }

    pub fn with_lesson(mut self, lesson_number: Option<u32>) -> Self {
        self.lesson_number = lesson_number;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.course_title.is_none() && self.lesson_number.is_none()
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        self.course_title
            .as_ref()
            .map_or(true, |title| &entry.course_title == title)
            && self
                .lesson_number
                .map_or(true, |n| entry.lesson_number == Some(n))
    }
}

/// A query hit.
#[derive(Debug, Clone)]
pub struct Hit {
    /// The matched entry.
    pub entry: Entry,
    /// Cosine distance to the query (lower is more similar).
    pub distance: f32,
}

impl Hit {
    /// Cosine similarity to the query.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Which backend stores the collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    Sqlite,
    Memory,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(VectorStoreProvider::Sqlite),
            "memory" => Ok(VectorStoreProvider::Memory),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

/// Trait for vector store implementations.
///
/// Queries against an empty collection, or with a filter nothing satisfies,
/// return an empty list rather than an error.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace an entry by id.
    async fn upsert(&self, collection: Collection, entry: &Entry) -> Result<()>;

    /// Insert or replace several entries.
    async fn upsert_batch(&self, collection: Collection, entries: &[Entry]) -> Result<usize>;

    /// Nearest entries by ascending cosine distance. Ties keep insertion order.
    async fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        top_k: usize,
        filter: &Filter,
    ) -> Result<Vec<Hit>>;

    /// Fetch an entry by id.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Entry>>;

    /// All entries in insertion order.
    async fn list(&self, collection: Collection) -> Result<Vec<Entry>>;

    /// Number of entries in a collection.
    async fn count(&self, collection: Collection) -> Result<usize>;

    /// Delete every entry belonging to a course.
    async fn delete_by_course(&self, collection: Collection, course_title: &str) -> Result<usize>;

    /// Delete every entry in a collection.
    async fn clear(&self, collection: Collection) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance: 0 for identical direction, 2 for opposite.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Rank candidates (given in insertion order) against a query embedding.
pub(crate) fn rank(candidates: impl IntoIterator<Item = Entry>, embedding: &[f32], top_k: usize) -> Vec<Hit> {
    let mut hits: Vec<Hit> = candidates
        .into_iter()
        .map(|entry| {
            let distance = cosine_distance(embedding, &entry.embedding);
            Hit { entry, distance }
        })
        .collect();

    // Stable sort keeps insertion order between equal distances.
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(top_k);
    hits
}
