use crate::application::services::agent::{AgentService, RunReport};
use crate::domain::value_objects::Facet;
use crate::presentation::cli::formatters::report_fmt::{
    format_report, print_section_header, report_json,
};

/// Which probes a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cadence {
    /// Every enabled probe; snapshot, diff and ledger are persisted.
    Full,
    /// Only the given facets; only the ledger is persisted.
    Notify(Vec<Facet>),
}

/// Runs one cycle and prints its report.
///
/// # Errors
///
/// Returns an error if JSON serialization of the report fails.
pub async fn run_cycle(
    service: &AgentService<'_>,
    cadence: &Cadence,
    json: bool,
) -> anyhow::Result<RunReport> {
    let report = match cadence {
        Cadence::Full => service.run_full().await,
        Cadence::Notify(facets) => service.run_notify(facets).await,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        let title = match cadence {
            Cadence::Full => "hostdrift run",
            Cadence::Notify(_) => "hostdrift notify",
        };
        print_section_header(title);
        for line in format_report(&report) {
            println!("{line}");
        }
    }
    Ok(report)
}
