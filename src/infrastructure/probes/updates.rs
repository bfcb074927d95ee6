use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;

use super::command::run_command;
use crate::domain::entities::probe_result::Observation;
use crate::domain::ports::probe::{Probe, ProbeContext, ProbeError};
use crate::domain::value_objects::probe_settings::UpdateSettings;
use crate::domain::value_objects::{Facet, FieldMap, FieldValue, ProbeStatus};

const APT_GET: &str = "/usr/bin/apt-get";

/// Pending package upgrades from a simulated `apt-get upgrade`.
pub struct UpdatesProbe;

/// Package names from the `Inst <pkg> ...` lines of `apt-get -s upgrade`.
#[must_use]
pub fn parse_apt_simulation(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix("Inst "))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(ToString::to_string)
        .collect()
}

#[must_use]
pub fn assess(count: usize, settings: &UpdateSettings) -> ProbeStatus {
    let count = u64::try_from(count).unwrap_or(u64::MAX);
    if settings.crit_threshold.is_some_and(|t| t > 0 && count >= t) {
        ProbeStatus::Crit
    } else if settings.warn_threshold > 0 && count >= settings.warn_threshold {
        ProbeStatus::Warn
    } else {
        ProbeStatus::Ok
    }
}

#[async_trait]
impl Probe for UpdatesProbe {
    fn facet(&self) -> Facet {
        Facet::Updates
    }

    async fn collect(&self, ctx: &ProbeContext) -> Result<Observation, ProbeError> {
        if !Path::new(APT_GET).exists() {
            return Err(ProbeError::ToolMissing(APT_GET.into()));
        }
        let stdout = run_command("apt-get", &["-s", "upgrade"], ctx.timeout)
            .await?
            .into_stdout("apt-get")?;
        let packages = parse_apt_simulation(&stdout);
        let count = packages.len();

        let mut data = FieldMap::new();
        data.insert("backend".into(), FieldValue::text("apt"));
        data.insert("count".into(), FieldValue::from(count));
        data.insert("packages".into(), FieldValue::name_set(packages));
        Ok(Observation::new(
            assess(count, &ctx.settings.updates),
            format!("updates={count}"),
            data,
        ))
    }
}
