//! Outline command implementation.

use crate::agent::format_outline;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the outline command.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.index().course_by_name(course).await? {
        Some(course) => println!("{}", format_outline(&course)),
        None => Output::warning(&format!("No course found matching '{}'", course)),
    }

    Ok(())
}
