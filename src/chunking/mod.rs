//! Content chunking for breaking lesson text into searchable segments.
//!
//! Lessons are split on sentence boundaries and packed into chunks of a
//! bounded character length, with trailing sentences carried over between
//! neighbouring chunks.

mod sentence;

pub use sentence::SentenceChunker;

use serde::{Deserialize, Serialize};

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Approximate number of characters re-included from the previous chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// A byte range of the chunked text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub start: usize,
    pub end: usize,
}

impl ChunkSpan {
    /// Borrow this span from the text it was computed on.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}
