//! Pipeline orchestrator for Pensum.
//!
//! Wires settings into concrete components and coordinates document loading
//! and querying.

use crate::agent::ToolContext;
use crate::chunking::SentenceChunker;
use crate::config::{Prompts, Settings};
use crate::course::CourseParser;
use crate::embedding::{Embedder, EmbeddingProvider, LocalEmbedder, OpenAIEmbedder};
use crate::error::Result;
use crate::generation::{Generator, OpenAIGenerator};
use crate::index::CourseIndex;
use crate::rag::{QueryResponse, RagEngine};
use crate::session::SessionStore;
use crate::vector_store::{MemoryVectorStore, SqliteVectorStore, VectorStore, VectorStoreProvider};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The main orchestrator for the Pensum pipeline.
pub struct Orchestrator {
    settings: Settings,
    parser: CourseParser,
    index: Arc<CourseIndex>,
    engine: RagEngine,
}

/// A document that made it into the index.
#[derive(Debug, Clone)]
pub struct LoadedCourse {
    pub title: String,
    pub chunks: usize,
}

/// Totals from loading a folder of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub courses_added: usize,
    pub chunks_added: usize,
    /// Documents whose course was already indexed.
    pub skipped: usize,
    /// Documents that could not be read, parsed or indexed.
    pub failed: usize,
}

/// What the index currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

impl Orchestrator {
    /// Create an orchestrator with the providers named in the settings.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let embedder: Arc<dyn Embedder> = match settings.embedding.provider {
            EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedder::with_config(
                &settings.embedding.model,
                settings.embedding.dimensions as usize,
            )?),
            EmbeddingProvider::Local => {
                Arc::new(LocalEmbedder::new(settings.embedding.dimensions as usize))
            }
        };

        let store: Arc<dyn VectorStore> = match settings.vector_store.provider {
            VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
            VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
        };

        let generator: Arc<dyn Generator> = Arc::new(
            OpenAIGenerator::new(&settings.generation.model)?
                .with_temperature(settings.generation.temperature)
                .with_max_tokens(settings.generation.max_tokens),
        );

        info!(
            "Using {:?} embeddings, {:?} store, model {}",
            settings.embedding.provider, settings.vector_store.provider, settings.generation.model
        );

        Self::with_components(settings, store, embedder, generator)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        settings.validate()?;

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let parser = CourseParser::new(SentenceChunker::from_config(&settings.chunking_config()));
        let index = Arc::new(CourseIndex::new(store, embedder));
        let tools = ToolContext::new(index.clone(), settings.search.max_results);
        let sessions = Arc::new(SessionStore::new(settings.session.window()));
        let engine = RagEngine::new(generator, tools, sessions).with_prompts(prompts);

        Ok(Self {
            settings,
            parser,
            index,
            engine,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the course index.
    pub fn index(&self) -> &Arc<CourseIndex> {
        &self.index
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.engine.sessions()
    }

    /// Answer a question, continuing the given session if there is one.
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<QueryResponse> {
        if let Some(max_idle) = self.settings.session.idle_timeout() {
            let pruned = self.sessions().prune_idle(max_idle);
            if pruned > 0 {
                debug!("Pruned {} idle sessions", pruned);
            }
        }
        self.engine.query(query, session_id).await
    }

    /// Parse one document and index it, replacing any course with the same title.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn add_course_document(&self, path: &Path) -> Result<LoadedCourse> {
        let parsed = self.parser.parse_file(path)?;
        let chunks = self.index.index_course(&parsed.course, &parsed.chunks).await?;
        info!("Indexed '{}' ({} chunks)", parsed.course.title, chunks);

        Ok(LoadedCourse {
            title: parsed.course.title,
            chunks,
        })
    }

    /// Load every course document in a directory.
    ///
    /// Courses already in the index are skipped. A document that fails is
    /// logged and counted, and loading carries on with the next one.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();

        if !dir.is_dir() {
            warn!("Documents directory {} does not exist", dir.display());
            return Ok(summary);
        }

        if clear_existing {
            info!("Clearing existing courses");
            self.index.clear().await?;
        }

        for path in self.document_paths(dir)? {
            let parsed = match self.parser.parse_file(&path) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    summary.failed += 1;
                    continue;
                }
            };

            match self.index.contains(&parsed.course.title).await {
                Ok(true) => {
                    debug!("Course '{}' already indexed", parsed.course.title);
                    summary.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to check {}: {}", path.display(), e);
                    summary.failed += 1;
                    continue;
                }
            }

            match self.index.index_course(&parsed.course, &parsed.chunks).await {
                Ok(chunks) => {
                    info!("Added course '{}' ({} chunks)", parsed.course.title, chunks);
                    summary.courses_added += 1;
                    summary.chunks_added += chunks;
                }
                Err(e) => {
                    warn!("Failed to index {}: {}", path.display(), e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Course documents directly inside `dir`, sorted by file name.
    fn document_paths(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            if path.is_file() && self.settings.documents.accepts(&path) {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }

    /// Count and list the indexed courses.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.index.course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Load the configured documents directory, as the server does at startup.
    pub async fn load_docs_dir(&self) -> Result<LoadSummary> {
        self.add_course_folder(&self.settings.docs_dir(), false).await
    }
}
