use std::collections::BTreeSet;
use std::io::SeekFrom;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::command::run_command;
use crate::domain::entities::probe_result::Observation;
use crate::domain::ports::probe::{Probe, ProbeContext, ProbeError};
use crate::domain::value_objects::probe_settings::LogSettings;
use crate::domain::value_objects::{Facet, FieldMap, FieldValue, ProbeStatus};

/// Recent login sources from `last` and failure counters from the auth log.
pub struct LogsProbe;

/// Sessions and their source addresses from `last -i`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Logins {
    pub sessions: usize,
    pub ips: BTreeSet<String>,
}

/// Failure counters from an auth log tail.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AuthCounters {
    pub failed_total: u64,
    pub failed_root: u64,
    pub invalid_user: u64,
}

#[must_use]
pub fn parse_last(text: &str) -> Logins {
    let mut logins = Logins::default();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("wtmp begins") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 || matches!(parts[0], "reboot" | "shutdown") {
            continue;
        }
        logins.sessions += 1;
        if let Ok(ip) = parts[2].parse::<IpAddr>() {
            if !ip.is_unspecified() {
                logins.ips.insert(ip.to_string());
            }
        }
    }
    logins
}

/// `for root` as whole words, so `for rootkit` does not count.
fn mentions_root(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    words.windows(2).any(|w| w[0] == "for" && w[1] == "root")
}

#[must_use]
pub fn parse_auth_lines(text: &str) -> AuthCounters {
    let mut counters = AuthCounters::default();
    for line in text.lines() {
        let lower = line.to_ascii_lowercase();
        if lower.contains("invalid user") {
            counters.invalid_user += 1;
        }
        if lower.contains("failed password") {
            counters.failed_total += 1;
            if mentions_root(&lower) {
                counters.failed_root += 1;
            }
        }
    }
    counters
}

/// Status and details for the counters. A zero threshold disables its check.
#[must_use]
pub fn assess(counters: AuthCounters, settings: &LogSettings) -> (ProbeStatus, String) {
    let reached = |value: u64, threshold: u64| threshold > 0 && value >= threshold;
    let status = if reached(counters.failed_root, settings.failed_root_crit_threshold) {
        ProbeStatus::Crit
    } else if reached(counters.failed_total, settings.failed_warn_threshold)
        || reached(counters.invalid_user, settings.failed_warn_threshold)
    {
        ProbeStatus::Warn
    } else {
        ProbeStatus::Ok
    };
    (
        status,
        format!(
            "failed={} root={} invalid={}",
            counters.failed_total, counters.failed_root, counters.invalid_user
        ),
    )
}

/// Reads at most `max_bytes` from the end of `path`. When the read starts
/// mid-file the leading partial line is dropped.
async fn read_tail(path: &Path, max_bytes: u64) -> Result<String, ProbeError> {
    let mut file = tokio::fs::File::open(path).await?;
    let size = file.metadata().await?.len();
    let start = size.saturating_sub(max_bytes);
    file.seek(SeekFrom::Start(start)).await?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).await?;

    let text = String::from_utf8_lossy(&buf).into_owned();
    if start == 0 {
        return Ok(text);
    }
    Ok(text
        .split_once('\n')
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_default())
}

fn first_existing(paths: &[PathBuf]) -> Option<&PathBuf> {
    paths.iter().find(|p| p.exists())
}

#[async_trait]
impl Probe for LogsProbe {
    fn facet(&self) -> Facet {
        Facet::Logs
    }

    async fn collect(&self, ctx: &ProbeContext) -> Result<Observation, ProbeError> {
        let settings = &ctx.settings.logs;

        let limit = settings.session_limit.to_string();
        let logins = match run_command("last", &["-i", "-n", &limit], ctx.timeout).await {
            Ok(output) => parse_last(&output.stdout),
            Err(e @ ProbeError::ToolMissing(_)) => {
                tracing::debug!("Skipping login history: {e}");
                Logins::default()
            }
            Err(e) => return Err(e),
        };

        let auth_log = first_existing(&settings.auth_log_paths);
        let counters = match auth_log {
            Some(path) => parse_auth_lines(&read_tail(path, settings.tail_bytes).await?),
            None => AuthCounters::default(),
        };
        let (status, details) = assess(counters, settings);

        let mut data = FieldMap::new();
        data.insert("ips".into(), FieldValue::name_set(logins.ips));
        data.insert("sessions".into(), FieldValue::from(logins.sessions));
        data.insert(
            "auth_log".into(),
            FieldValue::from(auth_log.map(|p| p.display().to_string())),
        );
        data.insert(
            "failed_total".into(),
            FieldValue::Int(i64::try_from(counters.failed_total).unwrap_or(i64::MAX)),
        );
        data.insert(
            "failed_root".into(),
            FieldValue::Int(i64::try_from(counters.failed_root).unwrap_or(i64::MAX)),
        );
        data.insert(
            "invalid_user".into(),
            FieldValue::Int(i64::try_from(counters.invalid_user).unwrap_or(i64::MAX)),
        );
        Ok(Observation::new(status, details, data))
    }
}
