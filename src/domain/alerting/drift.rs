use serde::{Deserialize, Serialize};

use super::{AlertRule, Condition, ConditionKind};
use crate::domain::entities::diff::{ChangeKind, Diff, DiffEntry};
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::value_objects::{Facet, FieldValue, Severity};

/// Maps matching diff entries to an alert condition.
///
/// An entry matches when facet and kind are equal, its path starts with
/// `path_prefix` (if set) and its new value equals `new_value` (if set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftRule {
    pub facet: Facet,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<FieldValue>,
    pub severity: Severity,
}

impl DriftRule {
    fn rule(facet: Facet, kind: ChangeKind, prefix: &str, severity: Severity) -> Self {
        Self {
            facet,
            kind,
            path_prefix: Some(prefix.to_string()),
            new_value: None,
            severity,
        }
    }

    /// Drift worth a message even when every probe reports `ok`.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        use ChangeKind::{Added, Changed, Removed};
        use Severity::{Critical, Warning};

        vec![
            Self::rule(Facet::Ports, Added, "ports[", Warning),
            Self::rule(Facet::Ports, Removed, "ports[", Warning),
            Self::rule(Facet::Users, Added, "sudo_users[", Critical),
            Self::rule(Facet::Logs, Added, "ips[", Warning),
            Self {
                new_value: Some(FieldValue::Bool(false)),
                ..Self::rule(Facet::Firewall, Changed, "enabled", Critical)
            },
            Self {
                new_value: Some(FieldValue::Bool(true)),
                ..Self::rule(Facet::Firewall, Changed, "enabled", Warning)
            },
            Self::rule(Facet::Firewall, Added, "rules[", Warning),
            Self::rule(Facet::Firewall, Removed, "rules[", Warning),
            Self::rule(Facet::Ssh, Changed, "config.", Warning),
            Self::rule(Facet::Ssh, Added, "config.", Warning),
            Self::rule(Facet::Ssh, Removed, "config.", Warning),
        ]
    }

    #[must_use]
    pub fn matches(&self, entry: &DiffEntry) -> bool {
        entry.facet == self.facet
            && entry.kind == self.kind
            && self
                .path_prefix
                .as_deref()
                .is_none_or(|prefix| entry.path.starts_with(prefix))
            && self
                .new_value
                .as_ref()
                .is_none_or(|expected| entry.new_value.as_ref() == Some(expected))
    }
}

fn describe(entry: &DiffEntry) -> String {
    let show = |value: Option<&FieldValue>| value.map_or_else(|| "null".to_string(), ToString::to_string);
    match entry.kind {
        ChangeKind::Added => format!(
            "{}: {} added ({})",
            entry.facet,
            entry.path,
            show(entry.new_value.as_ref())
        ),
        ChangeKind::Removed => format!(
            "{}: {} removed (was {})",
            entry.facet,
            entry.path,
            show(entry.old_value.as_ref())
        ),
        ChangeKind::Changed => format!(
            "{}: {} changed from {} to {}",
            entry.facet,
            entry.path,
            show(entry.old_value.as_ref()),
            show(entry.new_value.as_ref())
        ),
    }
}

impl AlertRule for DriftRule {
    fn name(&self) -> &'static str {
        "drift"
    }

    fn evaluate(&self, _snapshot: &Snapshot, diff: Option<&Diff>) -> Vec<Condition> {
        let Some(diff) = diff else {
            return Vec::new();
        };
        diff.entries
            .iter()
            .filter(|entry| self.matches(entry))
            .map(|entry| Condition {
                facet: entry.facet,
                path: entry.path.clone(),
                kind: ConditionKind::Drift(entry.kind),
                severity: self.severity,
                message: describe(entry),
            })
            .collect()
    }
}
