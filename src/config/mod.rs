//! Configuration module for Pensum.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts};
pub use settings::{
    DocumentSettings, EmbeddingSettings, GeneralSettings, GenerationSettings, PromptSettings,
    SearchSettings, SessionSettings, Settings, VectorStoreSettings,
};
