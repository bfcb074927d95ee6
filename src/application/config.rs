use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::alerting::{AlertPolicy, DriftRule};
use crate::domain::value_objects::probe_settings::{
    LogSettings, PortSettings, SshSettings, UpdateSettings, UserSettings,
};
use crate::domain::value_objects::{Facet, ProbeSettings, Severity};

/// Top-level application configuration loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Where the agent keeps its artifacts (tilde-expanded at point of use).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

/// Which probes run and how long they may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksConfig {
    #[serde(default = "default_enabled")]
    pub enabled: Vec<Facet>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_run_deadline")]
    pub run_deadline_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub ssh: SshSettings,
    #[serde(default)]
    pub ports: PortSettings,
    #[serde(default)]
    pub users: UserSettings,
    #[serde(default)]
    pub logs: LogSettings,
    #[serde(default)]
    pub updates: UpdateSettings,
}

/// Alert derivation and repeat suppression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Facets evaluated by the fast `notify` cadence.
    #[serde(default = "default_notify_facets")]
    pub notify_facets: Vec<Facet>,
    #[serde(default)]
    pub renotify_after_evaluations: Option<u32>,
    #[serde(default)]
    pub renotify_after_secs: Option<u64>,
    #[serde(default)]
    pub notify_resolved: bool,
    #[serde(default)]
    pub alert_on_unknown: bool,
    #[serde(default = "default_true")]
    pub status_alerts: bool,
    #[serde(default = "DriftRule::defaults")]
    pub drift_rules: Vec<DriftRule>,
}

/// Snapshot history pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

/// Notification channels: terminal and the JSONL outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub terminal: bool,
    /// Defaults to `outbox.jsonl` inside the state directory.
    #[serde(default)]
    pub outbox: Option<String>,
    /// The outbox is rotated to `<outbox>.1` once it reaches this size.
    #[serde(default = "default_outbox_max_bytes")]
    pub outbox_max_bytes: u64,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

// --- Defaults ---

// NOTE: Stored as raw string with tilde, expanded with shellexpand at point of use.
fn default_state_dir() -> String {
    "~/.local/state/hostdrift".into()
}

fn default_enabled() -> Vec<Facet> {
    vec![Facet::Ports, Facet::Ssh]
}

const fn default_timeout() -> u64 {
    20
}

const fn default_run_deadline() -> u64 {
    60
}

const fn default_max_concurrency() -> usize {
    4
}

fn default_notify_facets() -> Vec<Facet> {
    vec![
        Facet::Firewall,
        Facet::Logs,
        Facet::Ports,
        Facet::Updates,
        Facet::Users,
    ]
}

const fn default_true() -> bool {
    true
}

const fn default_max_snapshots() -> usize {
    200
}

const fn default_max_age_days() -> u32 {
    30
}

const fn default_outbox_max_bytes() -> u64 {
    1024 * 1024
}

const fn default_min_severity() -> Severity {
    Severity::Warning
}

// --- Default impls ---

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            timeout_secs: default_timeout(),
            run_deadline_secs: default_run_deadline(),
            max_concurrency: default_max_concurrency(),
            ssh: SshSettings::default(),
            ports: PortSettings::default(),
            users: UserSettings::default(),
            logs: LogSettings::default(),
            updates: UpdateSettings::default(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            notify_facets: default_notify_facets(),
            renotify_after_evaluations: None,
            renotify_after_secs: None,
            notify_resolved: false,
            alert_on_unknown: false,
            status_alerts: default_true(),
            drift_rules: DriftRule::defaults(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_snapshots: default_max_snapshots(),
            max_age_days: default_max_age_days(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            terminal: default_true(),
            outbox: None,
            outbox_max_bytes: default_outbox_max_bytes(),
            min_severity: default_min_severity(),
        }
    }
}

// --- Section helpers ---

impl GeneralConfig {
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_dir).as_ref())
    }
}

impl ChecksConfig {
    /// Enabled facets in stable order, duplicates dropped.
    #[must_use]
    pub fn enabled_facets(&self) -> Vec<Facet> {
        let mut facets = self.enabled.clone();
        facets.sort();
        facets.dedup();
        facets
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(if self.timeout_secs == 0 { 1 } else { self.timeout_secs })
    }

    #[must_use]
    pub const fn run_deadline(&self) -> Duration {
        Duration::from_secs(if self.run_deadline_secs == 0 {
            1
        } else {
            self.run_deadline_secs
        })
    }

    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    #[must_use]
    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            ssh: self.ssh.clone(),
            ports: self.ports.clone(),
            users: self.users.clone(),
            logs: self.logs.clone(),
            updates: self.updates.clone(),
        }
    }
}

impl AlertConfig {
    #[must_use]
    pub fn policy(&self) -> AlertPolicy {
        AlertPolicy {
            renotify_after_evaluations: self.renotify_after_evaluations,
            renotify_after: self
                .renotify_after_secs
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(TimeDelta::try_seconds),
            notify_resolved: self.notify_resolved,
        }
    }

    /// Facets for the fast cadence that are also enabled.
    #[must_use]
    pub fn notify_subset(&self, enabled: &[Facet]) -> Vec<Facet> {
        let mut facets: Vec<Facet> = self
            .notify_facets
            .iter()
            .copied()
            .filter(|facet| enabled.contains(facet))
            .collect();
        facets.sort();
        facets.dedup();
        facets
    }
}

impl RetentionConfig {
    #[must_use]
    pub fn max_age(&self) -> TimeDelta {
        TimeDelta::try_days(i64::from(self.max_age_days)).unwrap_or(TimeDelta::MAX)
    }
}

impl NotificationConfig {
    #[must_use]
    pub fn outbox_path(&self, state_dir: &Path) -> PathBuf {
        self.outbox.as_ref().map_or_else(
            || state_dir.join("outbox.jsonl"),
            |path| PathBuf::from(shellexpand::tilde(path).as_ref()),
        )
    }
}

// --- AppConfig methods ---

impl AppConfig {
    /// Load from a specific path, or create a default config file if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is invalid,
    /// or the default config file cannot be written.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Load from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML content is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to a specific path, creating parent directories if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created,
    /// serialization fails, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Default location: `<config dir>/hostdrift/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("hostdrift").join("config.toml"))
    }
}
