use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// hostdrift: host security drift detector
///
/// Probes SSH, ports, firewall, privileged users, auth logs and pending
/// updates, keeps snapshots, diffs them, and raises deduplicated alerts.
#[derive(Parser, Debug)]
#[command(name = "hostdrift")]
#[command(version, about, long_about)]
pub struct Cli {
    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to custom config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Full snapshot: run every enabled probe, diff, persist and alert
    #[command(alias = "r")]
    Run {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fast cadence: run the alerting probes only and update alerts
    #[command(alias = "n")]
    Notify {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a stored artifact as JSON
    #[command(alias = "s")]
    Show {
        /// Artifact to print
        #[arg(value_enum, default_value = "snapshot")]
        what: ShowTarget,

        /// Snapshot id: an archived snapshot, or the diff that led to it
        #[arg(long)]
        id: Option<String>,
    },

    /// Print the effective configuration
    #[command(alias = "c")]
    Config,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowTarget {
    Snapshot,
    Diff,
    Ledger,
    History,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_command() {
        let cli = Cli::try_parse_from(["hostdrift", "run"]).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cli.command, Some(Commands::Run { json: false }));
    }

    #[test]
    fn parse_notify_with_json() {
        let cli = Cli::try_parse_from(["hostdrift", "notify", "--json"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cli.command, Some(Commands::Notify { json: true }));
    }

    #[test]
    fn parse_aliases() {
        let cli = Cli::try_parse_from(["hostdrift", "n"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(cli.command, Some(Commands::Notify { .. })));
        let cli = Cli::try_parse_from(["hostdrift", "r"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(cli.command, Some(Commands::Run { .. })));
    }

    #[test]
    fn show_defaults_to_snapshot() {
        let cli = Cli::try_parse_from(["hostdrift", "show"]).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            cli.command,
            Some(Commands::Show {
                what: ShowTarget::Snapshot,
                id: None
            })
        );
    }

    #[test]
    fn parse_show_archived_snapshot() {
        let cli = Cli::try_parse_from([
            "hostdrift",
            "show",
            "snapshot",
            "--id",
            "20261019T083005.000Z",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            cli.command,
            Some(Commands::Show {
                what: ShowTarget::Snapshot,
                id: Some("20261019T083005.000Z".into())
            })
        );
    }

    #[test]
    fn parse_show_ledger() {
        let cli =
            Cli::try_parse_from(["hostdrift", "show", "ledger"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Some(Commands::Show {
                what: ShowTarget::Ledger,
                ..
            })
        ));
    }

    #[test]
    fn unknown_show_target_is_rejected() {
        assert!(Cli::try_parse_from(["hostdrift", "show", "everything"]).is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["hostdrift", "--config", "/tmp/test.toml", "-v", "run"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/test.toml")));
    }

    #[test]
    fn no_command_returns_none() {
        let cli = Cli::try_parse_from(["hostdrift"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(cli.command.is_none());
    }
}
