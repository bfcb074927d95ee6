pub mod drift;
pub mod status;
pub mod tracker;

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::domain::entities::diff::{ChangeKind, Diff};
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::value_objects::{Facet, Severity};

pub use drift::DriftRule;
pub use status::StatusRule;
pub use tracker::{AlertPolicy, AlertTracker, Evaluation};

/// What produced a condition: a probe status or a structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConditionKind {
    Status,
    Drift(ChangeKind),
}

impl ConditionKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Drift(kind) => kind.as_str(),
        }
    }
}

/// A candidate alertable condition found in one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub facet: Facet,
    pub path: String,
    pub kind: ConditionKind,
    pub severity: Severity,
    pub message: String,
}

impl Condition {
    /// Stable identity of the condition: never depends on time, message or
    /// severity, so a condition that escalates keeps its fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint(self.facet, &self.path, self.kind)
    }
}

/// First 16 hex chars of SHA-256 over `facet \0 path \0 kind`.
#[must_use]
pub fn fingerprint(facet: Facet, path: &str, kind: ConditionKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(facet.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(path.as_bytes());
    hasher.update([0]);
    hasher.update(kind.as_str().as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Derives alert conditions from a snapshot and the diff that produced it.
/// Rules are pure: no I/O, no ledger access.
pub trait AlertRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, snapshot: &Snapshot, diff: Option<&Diff>) -> Vec<Condition>;
}

/// Status conditions plus the given drift rules.
#[must_use]
pub fn default_rules(
    status_alerts: bool,
    alert_on_unknown: bool,
    drift_rules: Vec<DriftRule>,
) -> Vec<Box<dyn AlertRule>> {
    let mut rules: Vec<Box<dyn AlertRule>> = Vec::new();
    if status_alerts {
        rules.push(Box::new(StatusRule::new(alert_on_unknown)));
    }
    rules.extend(
        drift_rules
            .into_iter()
            .map(|rule| Box::new(rule) as Box<dyn AlertRule>),
    );
    rules
}

/// Runs every rule and merges their conditions.
pub struct ConditionEngine {
    rules: Vec<Box<dyn AlertRule>>,
}

impl ConditionEngine {
    #[must_use]
    pub fn new(rules: Vec<Box<dyn AlertRule>>) -> Self {
        Self { rules }
    }

    /// Conditions ordered by facet then path. Several rules matching the same
    /// change merge into one condition at the highest severity.
    #[must_use]
    pub fn derive(&self, snapshot: &Snapshot, diff: Option<&Diff>) -> Vec<Condition> {
        let mut merged: BTreeMap<(Facet, String, ConditionKind), Condition> = BTreeMap::new();
        for rule in &self.rules {
            for condition in rule.evaluate(snapshot, diff) {
                let key = (condition.facet, condition.path.clone(), condition.kind);
                match merged.get_mut(&key) {
                    Some(existing) if condition.severity > existing.severity => {
                        *existing = condition;
                    }
                    Some(_) => {}
                    None => {
                        merged.insert(key, condition);
                    }
                }
            }
        }
        merged.into_values().collect()
    }
}
