//! The generation layer: a chat model that either answers or asks for a tool.

mod openai;

pub use openai::OpenAIGenerator;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool the model may request, described by a JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Provider-assigned call id, echoed back with the result.
    pub id: String,
    pub name: String,
    /// Raw JSON arguments.
    pub arguments: String,
}

/// One message of the current exchange sent to the model.
///
/// Earlier exchanges travel in the system prompt, not as messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    User { content: String },
    /// The model's earlier request for a tool.
    ToolRequest(ToolRequest),
    /// The result of a tool request, keyed by its call id.
    ToolResult { id: String, content: String },
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User {
            content: content.into(),
        }
    }

    pub fn tool_result(id: impl Into<String>, content: impl Into<String>) -> Self {
        ChatMessage::ToolResult {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Everything the model sees for one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    /// Tools offered for this call. Empty means the model must answer.
    pub tools: Vec<ToolSpec>,
}

/// What the model decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A final text answer.
    Answer(String),
    /// A request to run a tool before answering.
    ToolRequest(ToolRequest),
}

/// Trait for chat model backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run one model call.
    async fn generate(&self, request: &GenerationRequest) -> Result<Decision>;
}
