use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hostdrift::application::config::AppConfig;
use hostdrift::application::services::agent::AgentService;
use hostdrift::application::services::registry::ProbeRegistry;
use hostdrift::domain::alerting::{default_rules, AlertTracker, ConditionEngine};
use hostdrift::domain::ports::notifier::Notifier;
use hostdrift::domain::ports::probe::ProbeContext;
use hostdrift::infrastructure::host::{host_meta, is_privileged};
use hostdrift::infrastructure::notifications::composite::CompositeNotifier;
use hostdrift::infrastructure::notifications::outbox::OutboxNotifier;
use hostdrift::infrastructure::notifications::terminal::TerminalNotifier;
use hostdrift::infrastructure::persistence::file_store::FileStore;
use hostdrift::infrastructure::persistence::lock::RunLock;
use hostdrift::infrastructure::probes::default_probes;
use hostdrift::presentation::cli::app::{Cli, Commands};
use hostdrift::presentation::cli::commands::config::run_config;
use hostdrift::presentation::cli::commands::run::{run_cycle, Cadence};
use hostdrift::presentation::cli::commands::show::run_show;

/// Logs go to stderr so `--json` output stays parseable. `RUST_LOG`
/// overrides the default level unless `--verbose` is given.
fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &AppConfig) -> FileStore {
    FileStore::new(&config.general.state_dir())
        .with_retention(config.retention.max_snapshots, config.retention.max_age())
}

fn build_notifier(config: &AppConfig, state_dir: &Path) -> CompositeNotifier {
    let mut notifiers: Vec<Box<dyn Notifier>> =
        vec![Box::new(
        OutboxNotifier::new(&config.notifications.outbox_path(state_dir))
            .with_max_bytes(config.notifications.outbox_max_bytes),
    )];
    if config.notifications.terminal {
        notifiers.push(Box::new(TerminalNotifier::new()));
    }
    CompositeNotifier::new(notifiers).with_min_severity(config.notifications.min_severity)
}

/// Runs one cycle under the state-directory lock and returns the exit code.
async fn run_agent(config: &AppConfig, full: bool, json: bool) -> anyhow::Result<i32> {
    let state_dir = config.general.state_dir();
    let _lock = match RunLock::acquire(&state_dir) {
        Ok(lock) => lock,
        Err(e) => {
            tracing::error!("Cannot start run: {e}");
            return Ok(1);
        }
    };

    // Manual DI: main.rs is the only place that knows concrete types
    let enabled = config.checks.enabled_facets();
    let registry = ProbeRegistry::new(
        default_probes(&enabled),
        config.checks.max_concurrency(),
        config.checks.run_deadline(),
    );
    let privileged = is_privileged();
    if !privileged {
        tracing::info!("Running unprivileged, some probes will report less");
    }
    let ctx = ProbeContext::new(
        privileged,
        config.checks.timeout(),
        config.checks.probe_settings(),
    );
    let host = host_meta();
    let conditions = ConditionEngine::new(default_rules(
        config.alerts.status_alerts,
        config.alerts.alert_on_unknown,
        config.alerts.drift_rules.clone(),
    ));
    let tracker = AlertTracker::new(config.alerts.policy());
    let store = open_store(config);
    let notifier = build_notifier(config, &state_dir);

    let service = AgentService::new(
        &registry,
        &ctx,
        &host,
        &conditions,
        &tracker,
        &store,
        &store,
        &store,
        &notifier,
    );
    let cadence = if full {
        Cadence::Full
    } else {
        Cadence::Notify(config.alerts.notify_subset(&enabled))
    };
    let report = run_cycle(&service, &cadence, json).await?;
    Ok(report.outcome.exit_code())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let config_path = match cli.config {
        Some(ref path) => path.clone(),
        None => AppConfig::config_path()?,
    };
    let config = if cli.config.is_some() {
        AppConfig::load_from(&config_path)?
    } else {
        AppConfig::load_or_create(&config_path)?
    };

    match cli.command.unwrap_or(Commands::Run { json: false }) {
        Commands::Run { json } => {
            let code = run_agent(&config, true, json).await?;
            std::process::exit(code);
        }
        Commands::Notify { json } => {
            let code = run_agent(&config, false, json).await?;
            std::process::exit(code);
        }
        Commands::Show { what, id } => {
            run_show(&open_store(&config), what, id.as_deref())?;
        }
        Commands::Config => {
            run_config(&config, &config_path)?;
        }
    }

    Ok(())
}
