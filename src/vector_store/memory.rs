//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{rank, Collection, Entry, Filter, Hit, VectorStore};
use crate::error::{PensumError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Collections = HashMap<Collection, Vec<Entry>>;

/// In-memory vector store.
///
/// Each collection is a vector kept in insertion order; an upsert of an
/// existing id replaces the entry in place.
pub struct MemoryVectorStore {
    collections: RwLock<Collections>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn insert(entries: &mut Vec<Entry>, entry: &Entry) {
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, collection: Collection, entry: &Entry) -> Result<()> {
        let mut collections = self.write()?;
        Self::insert(collections.entry(collection).or_default(), entry);
        Ok(())
    }

    async fn upsert_batch(&self, collection: Collection, entries: &[Entry]) -> Result<usize> {
        let mut collections = self.write()?;
        let stored = collections.entry(collection).or_default();
        for entry in entries {
            Self::insert(stored, entry);
        }
        Ok(entries.len())
    }

    async fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        top_k: usize,
        filter: &Filter,
    ) -> Result<Vec<Hit>> {
        let collections = self.read()?;
        let Some(entries) = collections.get(&collection) else {
            return Ok(Vec::new());
        };

        let candidates = entries.iter().filter(|e| filter.matches(e)).cloned();
        Ok(rank(candidates, embedding, top_k))
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Entry>> {
        let collections = self.read()?;
        Ok(collections
            .get(&collection)
            .and_then(|entries| entries.iter().find(|e| e.id == id).cloned()))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Entry>> {
        let collections = self.read()?;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        let collections = self.read()?;
        Ok(collections.get(&collection).map_or(0, Vec::len))
    }

    async fn delete_by_course(&self, collection: Collection, course_title: &str) -> Result<usize> {
        let mut collections = self.write()?;
        let Some(entries) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let initial_len = entries.len();
        entries.retain(|e| e.course_title != course_title);
        Ok(initial_len - entries.len())
    }

    async fn clear(&self, collection: Collection) -> Result<usize> {
        let mut collections = self.write()?;
        Ok(collections.remove(&collection).map_or(0, |entries| entries.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str, course: &str, lesson: Option<u32>, embedding: Vec<f32>) -> Entry {
        Entry {
            id: id.to_string(),
            content: format!("content of {}", id),
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: None,
            payload: None,
            embedding,
            indexed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        store
            .upsert_batch(
                Collection::Content,
                &[
                    entry("a_0", "A", Some(0), vec![1.0, 0.0, 0.0]),
                    entry("a_1", "A", Some(1), vec![0.0, 1.0, 0.0]),
                    entry("b_0", "B", Some(0), vec![0.9, 0.1, 0.0]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.count(Collection::Content).await.unwrap(), 3);
        assert_eq!(store.count(Collection::Catalog).await.unwrap(), 0);

        let hits = store
            .query(Collection::Content, &[1.0, 0.0, 0.0], 10, &Filter::none())
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].entry.id, "a_0");
        assert_eq!(hits[1].entry.id, "b_0");

        let hits = store
            .query(
                Collection::Content,
                &[1.0, 0.0, 0.0],
                10,
                &Filter::course("A").with_lesson(Some(1)),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, "a_1");
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let store = MemoryVectorStore::new();
        store.upsert(Collection::Catalog, &entry("first", "First", None, vec![1.0])).await.unwrap();
        store.upsert(Collection::Catalog, &entry("second", "Second", None, vec![1.0])).await.unwrap();

        let mut replacement = entry("first", "First", None, vec![1.0]);
        replacement.content = "updated".to_string();
        store.upsert(Collection::Catalog, &replacement).await.unwrap();

        let listed = store.list(Collection::Catalog).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].content, "updated");
        assert_eq!(listed[1].id, "second");
    }

    #[tokio::test]
    async fn test_empty_and_unsatisfiable_queries() {
        let store = MemoryVectorStore::new();
        let hits = store
            .query(Collection::Content, &[1.0], 5, &Filter::none())
            .await
            .unwrap();
        assert!(hits.is_empty());

        store.upsert(Collection::Content, &entry("x", "X", Some(1), vec![1.0])).await.unwrap();
        let hits = store
            .query(Collection::Content, &[1.0], 5, &Filter::course("Y"))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(
                Collection::Content,
                &[
                    entry("a_0", "A", Some(0), vec![1.0]),
                    entry("a_1", "A", Some(0), vec![1.0]),
                    entry("b_0", "B", Some(0), vec![1.0]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.delete_by_course(Collection::Content, "A").await.unwrap(), 2);
        assert_eq!(store.delete_by_course(Collection::Catalog, "A").await.unwrap(), 0);
        assert!(store.get(Collection::Content, "b_0").await.unwrap().is_some());
        assert_eq!(store.clear(Collection::Content).await.unwrap(), 1);
        assert_eq!(store.count(Collection::Content).await.unwrap(), 0);
    }
}
