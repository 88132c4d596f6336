//! CLI module for Pensum.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Pensum - Question answering over course material
///
/// Loads structured course documents into a searchable index and answers
/// questions about them, searching the material when the question needs it.
#[derive(Parser, Debug)]
#[command(name = "pensum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load course documents from a directory into the index
    Load {
        /// Directory of course documents (defaults to documents.docs_dir)
        dir: Option<String>,

        /// Remove all indexed courses before loading
        #[arg(long)]
        clear: bool,
    },

    /// Ask a question about the loaded courses
    Ask {
        /// The question to ask
        question: String,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Start an interactive chat session
    Chat,

    /// Search course content directly, without the model
    Search {
        /// Search query
        query: String,

        /// Restrict to a course (partial names are resolved)
        #[arg(short, long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(long)]
        lesson: Option<u32>,

        /// Maximum number of results (defaults to search.max_results)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List indexed courses
    Courses,

    /// Show a course outline
    Outline {
        /// Course name (partial names are resolved)
        course: String,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "search.max_results")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}
