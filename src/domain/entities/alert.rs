use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Facet, Severity};

/// Tracked alertable condition, keyed in the ledger by its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub fingerprint: String,
    pub facet: Facet,
    pub severity: Severity,
    pub message: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub occurrence_count: u32,
    /// When this condition was last handed to the dispatcher.
    pub last_dispatched_at: DateTime<Utc>,
    /// `occurrence_count` at the last dispatch.
    pub dispatched_occurrence: u32,
    /// Raised by a drift rule. Drift is a one-off change, so it clears on
    /// the next run without a resolution notice.
    #[serde(default)]
    pub drift: bool,
}

/// Why an event is being dispatched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DispatchReason {
    New,
    Escalated,
    Reminder,
    Resolved,
}

impl std::fmt::Display for DispatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Escalated => write!(f, "escalated"),
            Self::Reminder => write!(f, "reminder"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

/// An outbound dispatch decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    pub reason: DispatchReason,
    pub event: AlertEvent,
}

/// Durable fingerprint → event mapping owned by the alert tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertLedger {
    events: BTreeMap<String, AlertEvent>,
}

impl AlertLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<&AlertEvent> {
        self.events.get(fingerprint)
    }

    pub fn insert(&mut self, event: AlertEvent) {
        self.events.insert(event.fingerprint.clone(), event);
    }

    pub fn remove(&mut self, fingerprint: &str) -> Option<AlertEvent> {
        self.events.remove(fingerprint)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &AlertEvent> {
        self.events.values()
    }

    /// Drains every event that does not satisfy `keep`.
    pub fn take_unless(&mut self, keep: impl Fn(&AlertEvent) -> bool) -> Vec<AlertEvent> {
        let gone: Vec<String> = self
            .events
            .values()
            .filter(|event| !keep(event))
            .map(|event| event.fingerprint.clone())
            .collect();
        gone.iter().filter_map(|fp| self.events.remove(fp)).collect()
    }
}
