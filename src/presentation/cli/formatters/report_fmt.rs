use colored::Colorize;

use crate::application::services::agent::{RunOutcome, RunReport};

pub fn print_section_header(title: &str) {
    println!("{}", title.bold().cyan());
    let display_width = title.chars().count();
    println!("{}", "─".repeat(display_width).cyan());
}

#[must_use]
pub fn outcome_badge(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Success => " OK ".on_green().black().bold().to_string(),
        RunOutcome::Partial(_) => " PARTIAL ".on_yellow().black().bold().to_string(),
        RunOutcome::Failed(_) => " FAILED ".on_red().white().bold().to_string(),
    }
}

/// One line per report field, ready to print.
#[must_use]
pub fn format_report(report: &RunReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}",
        outcome_badge(&report.outcome),
        report.outcome
    )];
    if let Some(id) = &report.snapshot_id {
        lines.push(format!("  snapshot:   {id}"));
    }
    lines.push(format!("  changes:    {}", report.changes));
    lines.push(format!("  dispatched: {}", report.dispatched));
    lines
}

#[must_use]
pub fn report_json(report: &RunReport) -> serde_json::Value {
    let (outcome, detail) = match &report.outcome {
        RunOutcome::Success => ("success", serde_json::Value::Null),
        RunOutcome::Partial(facets) => ("partial", serde_json::json!(facets)),
        RunOutcome::Failed(reason) => ("failed", serde_json::json!(reason)),
    };
    serde_json::json!({
        "outcome": outcome,
        "detail": detail,
        "exit_code": report.outcome.exit_code(),
        "snapshot_id": report.snapshot_id,
        "changes": report.changes,
        "dispatched": report.dispatched,
    })
}
