//! Load command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the load command.
pub async fn run_load(dir: Option<&str>, clear: bool, settings: Settings) -> Result<()> {
    let dir = match dir {
        Some(dir) => Settings::expand_path(dir),
        None => settings.docs_dir(),
    };

    if !dir.is_dir() {
        Output::error(&format!("Not a directory: {}", dir.display()));
        return Err(anyhow::anyhow!("Documents directory not found: {}", dir.display()));
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Loading courses from {}...", dir.display()));
    let result = orchestrator.add_course_folder(&dir, clear).await;
    spinner.finish_and_clear();

    let summary = result?;
    Output::success(&format!(
        "Added {} courses ({} chunks)",
        summary.courses_added, summary.chunks_added
    ));
    if summary.skipped > 0 {
        Output::kv("Already indexed", &summary.skipped.to_string());
    }
    if summary.failed > 0 {
        Output::warning(&format!(
            "{} documents could not be loaded. Run with -v for details.",
            summary.failed
        ));
    }

    Ok(())
}
