use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Facet-specific probe settings handed to every probe through its context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSettings {
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshSettings {
    #[serde(default = "default_sshd_config")]
    pub config_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSettings {
    /// Inclusive `(start, end)` port ranges left out of the listening set.
    #[serde(default)]
    pub ignore_ranges: Vec<(u16, u16)>,
}

impl PortSettings {
    #[must_use]
    pub fn is_ignored(&self, port: u16) -> bool {
        self.ignore_ranges
            .iter()
            .any(|&(start, end)| port >= start && port <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Groups whose members count as privileged.
    #[serde(default = "default_admin_groups")]
    pub groups: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Candidate auth logs, first existing one wins.
    #[serde(default = "default_auth_logs")]
    pub auth_log_paths: Vec<PathBuf>,
    #[serde(default = "default_tail_bytes")]
    pub tail_bytes: u64,
    #[serde(default = "default_session_limit")]
    pub session_limit: usize,
    #[serde(default = "default_one")]
    pub failed_warn_threshold: u64,
    #[serde(default = "default_one")]
    pub failed_root_crit_threshold: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSettings {
    #[serde(default = "default_one")]
    pub warn_threshold: u64,
    #[serde(default)]
    pub crit_threshold: Option<u64>,
}

fn default_sshd_config() -> PathBuf {
    PathBuf::from("/etc/ssh/sshd_config")
}

fn default_admin_groups() -> Vec<String> {
    vec!["sudo".into(), "wheel".into()]
}

fn default_auth_logs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/var/log/auth.log"),
        PathBuf::from("/var/log/secure"),
    ]
}

const fn default_tail_bytes() -> u64 {
    256_000
}

const fn default_session_limit() -> usize {
    50
}

const fn default_one() -> u64 {
    1
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            config_path: default_sshd_config(),
        }
    }
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            groups: default_admin_groups(),
            ignore: Vec::new(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            auth_log_paths: default_auth_logs(),
            tail_bytes: default_tail_bytes(),
            session_limit: default_session_limit(),
            failed_warn_threshold: default_one(),
            failed_root_crit_threshold: default_one(),
        }
    }
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            warn_threshold: default_one(),
            crit_threshold: None,
        }
    }
}
