use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;

use super::command::run_command;
use crate::domain::entities::probe_result::Observation;
use crate::domain::ports::probe::{Probe, ProbeContext, ProbeError};
use crate::domain::value_objects::{Facet, FieldMap, FieldValue, ProbeStatus};

const UFW: &str = "/usr/sbin/ufw";
const FIREWALL_CMD: &str = "/usr/bin/firewall-cmd";

/// Firewall state from ufw, or firewalld when ufw is absent.
pub struct FirewallProbe;

/// Observed firewall state before it is mapped to a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallState {
    pub backend: &'static str,
    pub enabled: Option<bool>,
    pub rules: BTreeSet<String>,
}

/// `Status: active` / `Status: inactive` from `ufw status`.
#[must_use]
pub fn parse_ufw_status(text: &str) -> Option<bool> {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix("Status:"))
        .map(str::trim)
        .find_map(|state| match state {
            "active" => Some(true),
            "inactive" => Some(false),
            _ => None,
        })
}

/// Rules from `ufw status numbered`, without their `[ n]` index so that
/// inserting a rule does not renumber every other one.
#[must_use]
pub fn parse_ufw_rules(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix('['))
        .filter_map(|rest| rest.split_once(']'))
        .map(|(_, rule)| rule.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|rule| !rule.is_empty())
        .collect()
}

/// Services (as `service:<name>`) and ports from `firewall-cmd --list-all`.
#[must_use]
pub fn parse_firewalld_rules(text: &str) -> BTreeSet<String> {
    let mut rules = BTreeSet::new();
    for line in text.lines() {
        let line = line.trim();
        if let Some(services) = line.strip_prefix("services:") {
            rules.extend(services.split_whitespace().map(|s| format!("service:{s}")));
        } else if let Some(ports) = line.strip_prefix("ports:") {
            rules.extend(ports.split_whitespace().map(ToString::to_string));
        }
    }
    rules
}

/// Status, details and data for an observed state.
#[must_use]
pub fn observe(state: FirewallState) -> Observation {
    let (status, word) = match state.enabled {
        Some(true) => (ProbeStatus::Ok, "active"),
        Some(false) => (ProbeStatus::Crit, "inactive"),
        None => (ProbeStatus::Warn, "unknown"),
    };
    let details = format!("{} {word} rules={}", state.backend, state.rules.len());

    let mut data = FieldMap::new();
    data.insert("backend".into(), FieldValue::text(state.backend));
    data.insert("enabled".into(), FieldValue::from(state.enabled));
    data.insert("rules".into(), FieldValue::name_set(state.rules));
    Observation::new(status, details, data)
}

async fn ufw_state(ctx: &ProbeContext) -> Result<FirewallState, ProbeError> {
    if !ctx.privileged {
        return Err(ProbeError::PermissionDenied("ufw status requires root".into()));
    }
    let status = run_command("ufw", &["status"], ctx.timeout)
        .await?
        .into_stdout("ufw")?;
    let numbered = run_command("ufw", &["status", "numbered"], ctx.timeout)
        .await?
        .into_stdout("ufw")?;
    Ok(FirewallState {
        backend: "ufw",
        enabled: parse_ufw_status(&status),
        rules: parse_ufw_rules(&numbered),
    })
}

async fn firewalld_state(ctx: &ProbeContext) -> Result<FirewallState, ProbeError> {
    // `--state` exits non-zero when the daemon is stopped.
    let state = run_command("firewall-cmd", &["--state"], ctx.timeout).await?;
    let enabled = state.stdout.trim().eq_ignore_ascii_case("running");
    let rules = if enabled {
        let listing = run_command("firewall-cmd", &["--list-all"], ctx.timeout)
            .await?
            .into_stdout("firewall-cmd")?;
        parse_firewalld_rules(&listing)
    } else {
        BTreeSet::new()
    };
    Ok(FirewallState {
        backend: "firewalld",
        enabled: Some(enabled),
        rules,
    })
}

#[async_trait]
impl Probe for FirewallProbe {
    fn facet(&self) -> Facet {
        Facet::Firewall
    }

    async fn collect(&self, ctx: &ProbeContext) -> Result<Observation, ProbeError> {
        let state = if Path::new(UFW).exists() {
            ufw_state(ctx).await?
        } else if Path::new(FIREWALL_CMD).exists() {
            firewalld_state(ctx).await?
        } else {
            let mut data = FieldMap::new();
            data.insert("backend".into(), FieldValue::text("none"));
            data.insert("enabled".into(), FieldValue::Null);
            data.insert("rules".into(), FieldValue::name_set(Vec::<String>::new()));
            return Ok(Observation::new(
                ProbeStatus::Warn,
                "no supported firewall found",
                data,
            ));
        };
        Ok(observe(state))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    const UFW_NUMBERED: &str = "\
Status: active

     To                         Action      From
     --                         ------      ----
[ 1] 22/tcp                     ALLOW IN    Anywhere
[ 2] 443/tcp                    ALLOW IN    Anywhere
[10] 22/tcp (v6)                ALLOW IN    Anywhere (v6)
";

    const FIREWALLD: &str = "\
public (active)
  target: default
  interfaces: eth0
  services: dhcpv6-client ssh
  ports: 8080/tcp 9090/tcp
  forward-ports:
";

    #[test]
    fn ufw_status_states() {
        assert_eq!(parse_ufw_status("Status: active\n"), Some(true));
        assert_eq!(parse_ufw_status("Status: inactive\n"), Some(false));
        assert_eq!(parse_ufw_status("ERROR: problem running\n"), None);
    }

    #[test]
    fn ufw_rules_drop_numbering() {
        let rules = parse_ufw_rules(UFW_NUMBERED);
        assert_eq!(
            rules.into_iter().collect::<Vec<_>>(),
            vec![
                "22/tcp (v6) ALLOW IN Anywhere (v6)",
                "22/tcp ALLOW IN Anywhere",
                "443/tcp ALLOW IN Anywhere",
            ]
        );
    }

    #[test]
    fn renumbering_is_not_a_change() {
        let inserted = UFW_NUMBERED.replace("[ 2] 443/tcp", "[ 3] 443/tcp");
        assert_eq!(parse_ufw_rules(UFW_NUMBERED), parse_ufw_rules(&inserted));
    }

    #[test]
    fn firewalld_services_and_ports() {
        let rules = parse_firewalld_rules(FIREWALLD);
        assert_eq!(
            rules.into_iter().collect::<Vec<_>>(),
            vec!["8080/tcp", "9090/tcp", "service:dhcpv6-client", "service:ssh"]
        );
    }

    #[test]
    fn inactive_firewall_is_critical() {
        let observation = observe(FirewallState {
            backend: "ufw",
            enabled: Some(false),
            rules: BTreeSet::new(),
        });
        assert_eq!(observation.status, ProbeStatus::Crit);
        assert_eq!(observation.details, "ufw inactive rules=0");
        assert_eq!(observation.data["enabled"], FieldValue::Bool(false));
    }

    #[test]
    fn unknown_state_warns() {
        let observation = observe(FirewallState {
            backend: "ufw",
            enabled: None,
            rules: parse_ufw_rules(UFW_NUMBERED),
        });
        assert_eq!(observation.status, ProbeStatus::Warn);
        assert_eq!(observation.data["enabled"], FieldValue::Null);
        assert_eq!(observation.details, "ufw unknown rules=3");
    }
}
