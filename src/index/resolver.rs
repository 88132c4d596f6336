//! Fuzzy course-name resolution against the catalog collection.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{Collection, Filter, VectorStore};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Maps an approximate course name to the title of the closest indexed course.
pub struct CourseResolver {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl CourseResolver {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Resolve a partial name to an exact course title.
    ///
    /// Returns `None` when the catalog is empty. Among equally similar
    /// courses the one indexed first wins.
    #[instrument(skip(self))]
    pub async fn resolve(&self, partial_name: &str) -> Result<Option<String>> {
        let partial_name = partial_name.trim();
        if partial_name.is_empty() {
            return Ok(None);
        }

        let embedding = self.embedder.embed(partial_name).await?;
        let hits = self
            .store
            .query(Collection::Catalog, &embedding, 1, &Filter::none())
            .await?;

        let resolved = hits.into_iter().next().map(|hit| hit.entry.course_title);
        debug!("Resolved '{}' to {:?}", partial_name, resolved);
        Ok(resolved)
    }
}
