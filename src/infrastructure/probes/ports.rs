use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use super::command::run_command;
use crate::domain::entities::probe_result::Observation;
use crate::domain::ports::probe::{Probe, ProbeContext, ProbeError};
use crate::domain::value_objects::probe_settings::PortSettings;
use crate::domain::value_objects::{Facet, FieldMap, FieldValue, ProbeStatus};

/// Listening TCP/UDP sockets from `ss`.
pub struct PortsProbe;

#[derive(Debug, Default)]
struct Listener {
    port: u16,
    protocol: String,
    addresses: BTreeSet<String>,
    processes: BTreeSet<String>,
}

/// Splits `0.0.0.0:22`, `[::]:22`, `*:68` or `127.0.0.53%lo:53` into
/// address and port. Interface suffixes are dropped.
fn split_host_port(local: &str) -> Option<(String, u16)> {
    let (host, port) = local.rsplit_once(':')?;
    let port = port.parse().ok()?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let host = host.split('%').next().unwrap_or(host);
    Some((host.to_string(), port))
}

/// Command names from `users:(("sshd",pid=812,fd=3),("sshd",pid=813,fd=3))`.
/// Pids are discarded so restarts do not look like drift.
fn process_names(field: &str) -> BTreeSet<String> {
    field
        .split("(\"")
        .skip(1)
        .filter_map(|chunk| chunk.split('"').next())
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parses `ss -tulpnH` output into the `ports` set, keyed `port/protocol`.
/// Sockets bound to the same port on several addresses merge into one member.
#[must_use]
pub fn parse_ss_output(text: &str, settings: &PortSettings) -> FieldValue {
    let mut listeners: BTreeMap<String, Listener> = BTreeMap::new();

    for line in text.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            continue;
        }
        let protocol = parts[0].to_ascii_lowercase();
        let Some((address, port)) = split_host_port(parts[4]) else {
            continue;
        };
        if port == 0 || settings.is_ignored(port) {
            continue;
        }

        let listener = listeners
            .entry(format!("{port}/{protocol}"))
            .or_insert_with(|| Listener {
                port,
                protocol: protocol.clone(),
                ..Listener::default()
            });
        listener.addresses.insert(address);
        if let Some(process) = parts.get(6..) {
            listener.processes.extend(process_names(&process.join(" ")));
        }
    }

    FieldValue::set(listeners.into_iter().map(|(key, listener)| {
        let mut entry = FieldMap::new();
        entry.insert("port".into(), FieldValue::from(listener.port));
        entry.insert("protocol".into(), FieldValue::text(listener.protocol));
        entry.insert(
            "addresses".into(),
            FieldValue::List(listener.addresses.into_iter().map(FieldValue::Text).collect()),
        );
        let process = if listener.processes.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::text(listener.processes.into_iter().collect::<Vec<_>>().join(","))
        };
        entry.insert("process".into(), process);
        (key, FieldValue::Map(entry))
    }))
}

#[async_trait]
impl Probe for PortsProbe {
    fn facet(&self) -> Facet {
        Facet::Ports
    }

    async fn collect(&self, ctx: &ProbeContext) -> Result<Observation, ProbeError> {
        let stdout = run_command("ss", &["-tulpnH"], ctx.timeout)
            .await?
            .into_stdout("ss")?;
        let ports = parse_ss_output(&stdout, &ctx.settings.ports);
        let count = match &ports {
            FieldValue::Set(members) => members.len(),
            _ => 0,
        };

        let mut data = FieldMap::new();
        data.insert("ports".into(), ports);
        let details = if ctx.privileged {
            format!("{count} listening")
        } else {
            format!("{count} listening (process names need root)")
        };
        Ok(Observation::new(ProbeStatus::Ok, details, data))
    }
}
