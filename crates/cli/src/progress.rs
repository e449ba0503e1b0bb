use colored::Colorize;
use events::{Event, EventBus, StageStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Renders pipeline events as a spinner with one line per finished stage.
/// The task ends when the run finishes or the bus is dropped.
pub fn spawn(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(120));

        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    if render(&spinner, envelope.event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress display lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        spinner.finish_and_clear();
    })
}

/// Returns true once the run is over.
fn render(spinner: &ProgressBar, event: Event) -> bool {
    match event {
        Event::RunStarted {
            template, language, ..
        } => {
            spinner.println(format!(
                "{} template {}, language {}",
                "Building".bold(),
                template.cyan(),
                language.cyan()
            ));
        }
        Event::StageStarted { stage, .. } => {
            spinner.set_message(format!("{stage}..."));
        }
        Event::StageCompleted {
            stage,
            status,
            elapsed_ms,
            cumulative_cost_usd,
            ..
        } => {
            let mark = match status {
                StageStatus::Succeeded => "✓".green().bold(),
                StageStatus::Failed => "✗".red().bold(),
            };
            spinner.println(format!(
                "  {mark} {:<10} {:>6.1}s   ${:.4}",
                stage.to_string(),
                elapsed_ms as f64 / 1000.0,
                cumulative_cost_usd
            ));
        }
        Event::AgentRetry {
            agent,
            attempt,
            reason,
        } => {
            spinner.println(format!(
                "    {} {agent} attempt {attempt}: {reason}",
                "retry".yellow()
            ));
        }
        Event::AutoFixIteration {
            iteration,
            max_iterations,
            approved,
            blocking_issues,
            ..
        } => {
            let verdict = if approved {
                "approved".green()
            } else {
                format!("{blocking_issues} issue(s)").yellow()
            };
            spinner.set_message(format!("auto_fix review {iteration}/{max_iterations}: {verdict}"));
        }
        Event::Error { message, .. } => {
            spinner.println(format!("  {} {message}", "error".red().bold()));
        }
        Event::RunFinished { .. } => return true,
    }
    false
}
