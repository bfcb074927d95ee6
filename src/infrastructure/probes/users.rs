use std::collections::BTreeSet;

use async_trait::async_trait;

use super::command::run_command;
use crate::domain::entities::probe_result::Observation;
use crate::domain::ports::probe::{Probe, ProbeContext, ProbeError};
use crate::domain::value_objects::{Facet, FieldMap, FieldValue, ProbeStatus};

const GROUP_FILE: &str = "/etc/group";

/// Members of the administrative groups (`sudo`, `wheel` by default).
pub struct UsersProbe;

/// Members listed in one `name:x:gid:members` group line.
#[must_use]
pub fn parse_group_members(line: &str) -> Vec<String> {
    line.trim()
        .splitn(4, ':')
        .nth(3)
        .map(|members| {
            members
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Members of `groups` found in a whole group database.
#[must_use]
pub fn members_from_group_file(text: &str, groups: &[String]) -> BTreeSet<String> {
    text.lines()
        .filter(|line| {
            line.split(':')
                .next()
                .is_some_and(|name| groups.iter().any(|g| g == name))
        })
        .flat_map(parse_group_members)
        .collect()
}

async fn members_via_getent(
    groups: &[String],
    ctx: &ProbeContext,
) -> Result<BTreeSet<String>, ProbeError> {
    let mut members = BTreeSet::new();
    for group in groups {
        let output = run_command("getent", &["group", group], ctx.timeout).await?;
        // Exit status 2: no such group.
        if output.success {
            members.extend(parse_group_members(&output.stdout));
        }
    }
    Ok(members)
}

#[async_trait]
impl Probe for UsersProbe {
    fn facet(&self) -> Facet {
        Facet::Users
    }

    async fn collect(&self, ctx: &ProbeContext) -> Result<Observation, ProbeError> {
        let settings = &ctx.settings.users;
        let mut members = match members_via_getent(&settings.groups, ctx).await {
            Ok(members) => members,
            Err(ProbeError::ToolMissing(_)) => {
                tracing::debug!("getent missing, reading {GROUP_FILE}");
                let text = tokio::fs::read_to_string(GROUP_FILE).await?;
                members_from_group_file(&text, &settings.groups)
            }
            Err(e) => return Err(e),
        };
        members.retain(|user| !settings.ignore.contains(user));

        let details = format!("sudo_users={}", members.len());
        let mut data = FieldMap::new();
        data.insert("sudo_users".into(), FieldValue::name_set(members));
        Ok(Observation::new(ProbeStatus::Ok, details, data))
    }
}
