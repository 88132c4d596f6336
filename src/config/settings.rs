//! Configuration settings for Pensum.

use crate::chunking::ChunkingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{PensumError, Result};
use crate::vector_store::VectorStoreProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub documents: DocumentSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub generation: GenerationSettings,
    pub search: SearchSettings,
    pub session: SessionSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.pensum".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Course document loading and chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// Directory scanned by `load` and at server startup.
    pub docs_dir: String,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters of trailing sentences carried into the next chunk.
    pub chunk_overlap: usize,
    /// File extensions treated as course documents.
    pub extensions: Vec<String>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            docs_dir: "./docs".to_string(),
            chunk_size: 800,
            chunk_overlap: 100,
            extensions: vec!["txt".to_string(), "md".to_string()],
        }
    }
}

impl DocumentSettings {
    /// Whether a path has one of the configured extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, local).
    pub provider: EmbeddingProvider,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: VectorStoreProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Sqlite,
            sqlite_path: "~/.pensum/index.db".to_string(),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Chat model used for answers and tool decisions.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 800,
        }
    }
}

/// Search tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Maximum number of chunks a search returns.
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { max_results: 5 }
    }
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Remembered exchanges (user question plus answer) per session.
    pub max_history: usize,
    /// Sessions idle for longer than this are dropped.
    pub idle_timeout_minutes: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_history: 2,
            idle_timeout_minutes: None,
        }
    }
}

impl SessionSettings {
    /// Session window in turns.
    pub fn window(&self) -> usize {
        self.max_history * 2
    }

    pub fn idle_timeout(&self) -> Option<chrono::Duration> {
        self.idle_timeout_minutes
            .and_then(|minutes| i64::try_from(minutes).ok())
            .map(chrono::Duration::minutes)
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PensumError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pensum")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded documents directory path.
    pub fn docs_dir(&self) -> PathBuf {
        Self::expand_path(&self.documents.docs_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Default tracing filter directive. Any `-v` flag overrides
    /// `general.log_level`.
    pub fn log_directive(&self, verbose: u8) -> String {
        let level = match verbose {
            0 => self.general.log_level.trim(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("pensum={}", level)
    }

    pub fn chunking_config(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.documents.chunk_size,
            chunk_overlap: self.documents.chunk_overlap,
        }
    }

    /// Reject combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.documents.chunk_size == 0 {
            return Err(PensumError::Config("documents.chunk_size must be positive".into()));
        }
        if self.documents.chunk_overlap >= self.documents.chunk_size {
            return Err(PensumError::Config(format!(
                "documents.chunk_overlap ({}) must be smaller than documents.chunk_size ({})",
                self.documents.chunk_overlap, self.documents.chunk_size
            )));
        }
        if self.search.max_results == 0 {
            return Err(PensumError::Config("search.max_results must be positive".into()));
        }
        if self.session.max_history == 0 {
            return Err(PensumError::Config("session.max_history must be positive".into()));
        }
        Ok(())
    }

    /// Return a copy with one dotted key (e.g. `search.max_results`) replaced.
    ///
    /// The value is read as a TOML literal when it parses as one and as a
    /// plain string otherwise.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Self> {
        let mut root = toml::Value::try_from(self).map_err(|e| PensumError::Config(e.to_string()))?;

        let parts: Vec<&str> = key.split('.').collect();
        let Some((field, sections)) = parts.split_last() else {
            return Err(PensumError::Config(format!("Invalid key: {}", key)));
        };

        let mut table = &mut root;
        for section in sections {
            table = table
                .get_mut(*section)
                .ok_or_else(|| PensumError::Config(format!("Unknown config section: {}", section)))?;
        }
        let table = table
            .as_table_mut()
            .ok_or_else(|| PensumError::Config(format!("Not a config section: {}", key)))?;
        if !table.contains_key(*field) && !is_optional_field(key) {
            return Err(PensumError::Config(format!("Unknown config key: {}", key)));
        }

        table.insert(field.to_string(), parse_value(value));

        let updated: Settings = root
            .try_into()
            .map_err(|e: toml::de::Error| PensumError::Config(format!("Invalid value for {}: {}", key, e)))?;
        updated.validate()?;
        Ok(updated)
    }
}

/// Keys that are omitted from the serialized form while unset.
fn is_optional_field(key: &str) -> bool {
    matches!(key, "session.idle_timeout_minutes" | "prompts.custom_dir")
        || key.starts_with("prompts.variables.")
}

fn parse_value(raw: &str) -> toml::Value {
    format!("v = {}", raw)
        .parse::<toml::Table>()
        .ok()
        .and_then(|mut table| table.remove("v"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}
