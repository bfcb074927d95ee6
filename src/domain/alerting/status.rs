use super::{AlertRule, Condition, ConditionKind};
use crate::domain::entities::diff::Diff;
use crate::domain::entities::snapshot::Snapshot;

/// Raises a condition for every facet whose probe reports warn or crit.
pub struct StatusRule {
    alert_on_unknown: bool,
}

impl StatusRule {
    #[must_use]
    pub const fn new(alert_on_unknown: bool) -> Self {
        Self { alert_on_unknown }
    }
}

impl AlertRule for StatusRule {
    fn name(&self) -> &'static str {
        "probe_status"
    }

    fn evaluate(&self, snapshot: &Snapshot, _diff: Option<&Diff>) -> Vec<Condition> {
        snapshot
            .results
            .values()
            .filter_map(|result| {
                let severity = result.status.severity(self.alert_on_unknown)?;
                Some(Condition {
                    facet: result.facet,
                    path: result.facet.as_str().to_string(),
                    kind: ConditionKind::Status,
                    severity,
                    message: format!("{} is {}: {}", result.facet, result.status, result.details),
                })
            })
            .collect()
    }
}
