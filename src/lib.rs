//! Pensum - Question answering over course material
//!
//! A local-first CLI tool and HTTP service that indexes structured course
//! documents and answers questions about them with retrieval-augmented
//! generation.
//!
//! # Overview
//!
//! Pensum allows you to:
//! - Load course documents (title, instructor, links and numbered lessons)
//! - Search lesson content semantically, narrowed to a course or lesson
//! - Ask questions in a session and get answers with their course sources
//! - Browse course outlines
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `course` - Course model and document parsing
//! - `chunking` - Sentence-aware chunking with overlap
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction over two collections
//! - `index` - Course-level indexing, search and name resolution
//! - `agent` - Tools the model can call
//! - `generation` - Chat model abstraction
//! - `session` - Conversation history per session
//! - `rag` - Query engine
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use pensum::config::Settings;
//! use pensum::orchestrator::Orchestrator;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let summary = orchestrator.add_course_folder(Path::new("docs"), false).await?;
//!     println!("Indexed {} courses", summary.courses_added);
//!
//!     let response = orchestrator.query("What does lesson 2 cover?", None).await?;
//!     println!("{}", response.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod course;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod session;
pub mod vector_store;

pub use error::{PensumError, Result};
