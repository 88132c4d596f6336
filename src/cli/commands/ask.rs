//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, session: Option<&str>, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    if orchestrator.index().course_count().await? == 0 {
        Output::warning("No courses indexed yet. Use 'pensum load <dir>' to add course documents.");
    }

    let spinner = Output::spinner("Thinking...");
    let result = orchestrator.query(question, session).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.answer);
            Output::sources(&response.sources);
            println!();
            Output::kv("Session", &response.session_id);
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
