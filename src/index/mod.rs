//! Course-level view over the two vector collections.
//!
//! A course is written as one catalog entry (title embedding plus the full
//! course as a JSON payload) and one content entry per chunk. Both are
//! replaced together when a course is re-indexed.

mod resolver;

pub use resolver::CourseResolver;

use crate::course::{Course, CourseChunk};
use crate::embedding::Embedder;
use crate::error::{PensumError, Result};
use crate::vector_store::{Collection, Entry, Filter, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: CourseChunk,
    pub similarity: f32,
}

/// Outcome of a content search.
///
/// An unresolvable course name is reported through `error`, and a search
/// that matched nothing has no hits. Neither is a failure.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    /// Hits ordered most similar first.
    pub hits: Vec<SearchHit>,
    /// The resolved course title, when a course filter was applied.
    pub course_title: Option<String>,
    /// The lesson filter, when one was applied.
    pub lesson_number: Option<u32>,
    /// Human-readable reason the search could not run.
    pub error: Option<String>,
}

impl SearchResults {
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// The course index.
pub struct CourseIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    resolver: CourseResolver,
}

impl CourseIndex {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        let resolver = CourseResolver::new(store.clone(), embedder.clone());
        Self {
            store,
            embedder,
            resolver,
        }
    }

    pub fn resolver(&self) -> &CourseResolver {
        &self.resolver
    }

    /// Write a course and its chunks, replacing any earlier version.
    ///
    /// If any write fails, whatever was written for the course is removed
    /// from both collections before the error is returned.
    #[instrument(skip(self, course, chunks), fields(course = %course.title, chunks = chunks.len()))]
    pub async fn index_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<usize> {
        self.remove_course(&course.title).await?;

        match self.write_course(course, chunks).await {
            Ok(written) => {
                info!("Indexed course '{}' with {} chunks", course.title, written);
                Ok(written)
            }
            Err(e) => {
                warn!("Indexing course '{}' failed, cleaning up: {}", course.title, e);
                if let Err(cleanup) = self.remove_course(&course.title).await {
                    warn!("Cleanup of course '{}' failed: {}", course.title, cleanup);
                }
                Err(PensumError::IndexWrite {
                    course: course.title.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn write_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<usize> {
        let payload = serde_json::to_string(course)?;
        let summary_embedding = self.embedder.embed(&course.title).await?;
        self.store
            .upsert(
                Collection::Catalog,
                &Entry::summary(&course.title, payload, summary_embedding),
            )
            .await?;

        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(PensumError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let entries: Vec<Entry> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Entry::chunk(chunk, embedding))
            .collect();

        self.store.upsert_batch(Collection::Content, &entries).await
    }

    /// Remove a course from both collections.
    pub async fn remove_course(&self, title: &str) -> Result<usize> {
        let summaries = self.store.delete_by_course(Collection::Catalog, title).await?;
        let chunks = self.store.delete_by_course(Collection::Content, title).await?;
        Ok(summaries + chunks)
    }

    /// Search course content, optionally narrowed to a course and lesson.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
        limit: usize,
    ) -> Result<SearchResults> {
        let course_title = match course_name {
            Some(name) => match self.resolver.resolve(name).await? {
                Some(title) => Some(title),
                None => return Ok(SearchResults::with_error(format!("No course found matching '{}'", name))),
            },
            None => None,
        };

        let filter = Filter {
            course_title: course_title.clone(),
            lesson_number,
        };

        let embedding = self.embedder.embed(query).await?;
        let hits = self
            .store
            .query(Collection::Content, &embedding, limit, &filter)
            .await?;

        debug!("Search for '{}' returned {} hits", query, hits.len());

        Ok(SearchResults {
            hits: hits
                .into_iter()
                .map(|hit| SearchHit {
                    similarity: hit.similarity(),
                    chunk: CourseChunk {
                        text: hit.entry.content,
                        course_title: hit.entry.course_title,
                        lesson_number: hit.entry.lesson_number,
                        chunk_index: hit.entry.chunk_index.unwrap_or_default(),
                    },
                })
                .collect(),
            course_title,
            lesson_number,
            error: None,
        })
    }

    /// Fetch a course by exact title.
    pub async fn course(&self, title: &str) -> Result<Option<Course>> {
        let Some(entry) = self.store.get(Collection::Catalog, title).await? else {
            return Ok(None);
        };
        let payload = entry.payload.ok_or_else(|| {
            PensumError::VectorStore(format!("Catalog entry '{}' has no course payload", title))
        })?;
        Ok(Some(serde_json::from_str(&payload)?))
    }

    /// Resolve an approximate name and fetch that course.
    pub async fn course_by_name(&self, name: &str) -> Result<Option<Course>> {
        match self.resolver.resolve(name).await? {
            Some(title) => self.course(&title).await,
            None => Ok(None),
        }
    }

    /// Link of a lesson, if the course and lesson exist and the lesson has one.
    pub async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        Ok(self
            .course(course_title)
            .await?
            .and_then(|course| course.lesson(lesson_number).and_then(|l| l.link.clone())))
    }

    /// Whether a course with this exact title is indexed.
    pub async fn contains(&self, title: &str) -> Result<bool> {
        Ok(self.store.get(Collection::Catalog, title).await?.is_some())
    }

    /// Titles of all indexed courses, in the order they were indexed.
    pub async fn course_titles(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list(Collection::Catalog)
            .await?
            .into_iter()
            .map(|e| e.course_title)
            .collect())
    }

    pub async fn course_count(&self) -> Result<usize> {
        self.store.count(Collection::Catalog).await
    }

    /// Number of indexed content chunks.
    pub async fn chunk_count(&self) -> Result<usize> {
        self.store.count(Collection::Content).await
    }

    /// Empty both collections.
    pub async fn clear(&self) -> Result<()> {
        let courses = self.store.clear(Collection::Catalog).await?;
        let chunks = self.store.clear(Collection::Content).await?;
        info!("Cleared {} courses and {} chunks", courses, chunks);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::SentenceChunker;
    use crate::course::{CourseParser, Lesson};
    use crate::embedding::LocalEmbedder;
    use crate::vector_store::{Hit, MemoryVectorStore};
    use async_trait::async_trait;

    const DOC: &str = "Course Title: Rust Basics
Course Link: https://example.com/rust
Course Instructor: Ferris

Lesson 1: Ownership
Lesson Link: https://example.com/rust/1
Every value has a single owner. Moving transfers ownership.

Lesson 2: Borrowing
References borrow values without taking ownership. Mutable borrows are exclusive.
";

    fn index() -> CourseIndex {
        CourseIndex::new(Arc::new(MemoryVectorStore::new()), Arc::new(LocalEmbedder::default()))
    }

    async fn load(index: &CourseIndex, doc: &str) -> Course {
        let parsed = CourseParser::new(SentenceChunker::new(800, 100)).parse(doc).unwrap();
        index.index_course(&parsed.course, &parsed.chunks).await.unwrap();
        parsed.course
    }

    #[tokio::test]
    async fn test_index_and_fetch_course() {
        let index = index();
        let course = load(&index, DOC).await;

        assert_eq!(index.course_count().await.unwrap(), 1);
        assert_eq!(index.chunk_count().await.unwrap(), 2);
        assert_eq!(index.course("Rust Basics").await.unwrap(), Some(course));
        assert_eq!(
            index.lesson_link("Rust Basics", 1).await.unwrap().as_deref(),
            Some("https://example.com/rust/1")
        );
        assert!(index.lesson_link("Rust Basics", 2).await.unwrap().is_none());
        assert!(index.course("Missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reindex_overwrites() {
        let index = index();
        load(&index, DOC).await;
        load(&index, DOC).await;

        assert_eq!(index.course_count().await.unwrap(), 1);
        assert_eq!(index.chunk_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_titles_differing_by_underscore_keep_their_content() {
        let store = Arc::new(MemoryVectorStore::new());
        let index = CourseIndex::new(store.clone(), Arc::new(LocalEmbedder::default()));
        load(&index, "Course Title: Intro Rust\n\nLesson 1: Start\nBorrowing rules apply.").await;
        load(&index, "Course Title: Intro_Rust\n\nLesson 1: Start\nLifetimes are annotations.").await;

        assert_eq!(index.course_count().await.unwrap(), 2);
        assert_eq!(index.chunk_count().await.unwrap(), 2);

        let content = store.list(Collection::Content).await.unwrap();
        let owners: Vec<&str> = content.iter().map(|e| e.course_title.as_str()).collect();
        assert_eq!(owners, vec!["Intro Rust", "Intro_Rust"]);
        assert!(content[0].content.contains("Borrowing"));
        assert!(content[1].content.contains("Lifetimes"));

        let results = index.search("rules lifetimes", None, None, 5).await.unwrap();
        assert_eq!(results.hits.len(), 2);
    }

    #[tokio::test]
    async fn test_search_filters_by_resolved_course_and_lesson() {
        let index = index();
        load(&index, DOC).await;
        load(
            &index,
            "Course Title: Baking Bread\n\nLesson 1: Flour\nFlour holds water and ownership of the dough.",
        )
        .await;

        let results = index.search("ownership", Some("rust"), None, 5).await.unwrap();
        assert_eq!(results.course_title.as_deref(), Some("Rust Basics"));
        assert!(!results.is_empty());
        assert!(results.hits.iter().all(|h| h.chunk.course_title == "Rust Basics"));

        let results = index.search("ownership", Some("Rust Basics"), Some(2), 5).await.unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].chunk.lesson_number, Some(2));

        let results = index.search("ownership", Some("Rust Basics"), Some(9), 5).await.unwrap();
        assert!(results.is_empty());
        assert!(results.error.is_none());
    }

    #[tokio::test]
    async fn test_search_unknown_course_on_empty_index() {
        let index = index();
        let results = index.search("anything", Some("Quantum Computing"), None, 5).await.unwrap();

        assert!(results.is_empty());
        assert_eq!(results.error.as_deref(), Some("No course found matching 'Quantum Computing'"));
    }

    #[tokio::test]
    async fn test_course_titles_in_index_order() {
        let index = index();
        load(&index, "Course Title: Second\n\nBody.").await;
        load(&index, DOC).await;

        assert_eq!(index.course_titles().await.unwrap(), vec!["Second", "Rust Basics"]);
        assert!(index.contains("Second").await.unwrap());

        index.clear().await.unwrap();
        assert_eq!(index.course_count().await.unwrap(), 0);
        assert_eq!(index.chunk_count().await.unwrap(), 0);
    }

    /// Store whose batch writes always fail.
    struct FailingBatchStore {
        inner: MemoryVectorStore,
    }

    #[async_trait]
    impl VectorStore for FailingBatchStore {
        async fn upsert(&self, collection: Collection, entry: &Entry) -> Result<()> {
            self.inner.upsert(collection, entry).await
        }
        async fn upsert_batch(&self, _collection: Collection, _entries: &[Entry]) -> Result<usize> {
            Err(PensumError::VectorStore("disk full".to_string()))
        }
        async fn query(&self, c: Collection, e: &[f32], k: usize, f: &Filter) -> Result<Vec<Hit>> {
            self.inner.query(c, e, k, f).await
        }
        async fn get(&self, c: Collection, id: &str) -> Result<Option<Entry>> {
            self.inner.get(c, id).await
        }
        async fn list(&self, c: Collection) -> Result<Vec<Entry>> {
            self.inner.list(c).await
        }
        async fn count(&self, c: Collection) -> Result<usize> {
            self.inner.count(c).await
        }
        async fn delete_by_course(&self, c: Collection, title: &str) -> Result<usize> {
            self.inner.delete_by_course(c, title).await
        }
        async fn clear(&self, c: Collection) -> Result<usize> {
            self.inner.clear(c).await
        }
    }

    #[tokio::test]
    async fn test_failed_write_cleans_up_both_collections() {
        let store = Arc::new(FailingBatchStore {
            inner: MemoryVectorStore::new(),
        });
        let index = CourseIndex::new(store.clone(), Arc::new(LocalEmbedder::default()));

        let mut course = Course::new("Doomed");
        course.lessons.push(Lesson {
            number: 0,
            title: String::new(),
            link: None,
        });
        let chunks = vec![CourseChunk {
            text: "Course Doomed Lesson 0 content: text".to_string(),
            course_title: "Doomed".to_string(),
            lesson_number: Some(0),
            chunk_index: 0,
        }];

        let err = index.index_course(&course, &chunks).await.unwrap_err();
        assert!(matches!(err, PensumError::IndexWrite { ref course, .. } if course == "Doomed"));
        assert_eq!(store.count(Collection::Catalog).await.unwrap(), 0);
        assert_eq!(store.count(Collection::Content).await.unwrap(), 0);
    }
}
