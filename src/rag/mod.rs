//! RAG (Retrieval-Augmented Generation) question answering with sources.
//!
//! A query moves through an explicit state machine:
//!
//! ```text
//! Received ──answer──────────────────────────────────────▶ Answered
//!    │                                                        ▲
//!    └──tool request──▶ ToolInvoked ──▶ ToolResultIncorporated ┘
//! ```
//!
//! At most one tool runs per query. After the tool result is incorporated
//! the model is asked again without tools and must answer.

mod engine;
mod response;

pub use engine::RagEngine;
pub use response::QueryResponse;

use crate::generation::ToolRequest;

/// Where a query is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    /// The question has been sent to the model.
    Received,
    /// The model asked for a tool, which has not run yet.
    ToolInvoked(ToolRequest),
    /// The tool result is part of the conversation; the model owes an answer.
    ToolResultIncorporated,
    /// The model produced its final answer.
    Answered(String),
}
