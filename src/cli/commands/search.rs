//! Search command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    course: Option<&str>,
    lesson: Option<u32>,
    limit: Option<usize>,
    settings: Settings,
) -> Result<()> {
    let limit = limit.unwrap_or(settings.search.max_results);
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.index().search(query, course, lesson, limit).await;
    spinner.finish_and_clear();

    let results = match results {
        Ok(results) => results,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if let Some(error) = &results.error {
        Output::warning(error);
        return Ok(());
    }

    if results.is_empty() {
        Output::warning("No results found matching your query.");
        return Ok(());
    }

    match &results.course_title {
        Some(title) => Output::success(&format!("Found {} results in '{}'", results.hits.len(), title)),
        None => Output::success(&format!("Found {} results", results.hits.len())),
    }

    for hit in &results.hits {
        Output::search_hit(
            &hit.chunk.course_title,
            hit.chunk.lesson_number,
            hit.similarity,
            &hit.chunk.text,
        );
    }

    Ok(())
}
