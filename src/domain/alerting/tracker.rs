use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};

use super::{Condition, ConditionKind};
use crate::domain::entities::alert::{AlertEvent, AlertLedger, Dispatch, DispatchReason};
use crate::domain::value_objects::Facet;

/// When an active condition is surfaced again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertPolicy {
    /// Re-dispatch once this many further evaluations have seen the condition.
    pub renotify_after_evaluations: Option<u32>,
    /// Re-dispatch once this much time has passed since the last dispatch.
    pub renotify_after: Option<TimeDelta>,
    /// Emit a notice when a condition clears.
    pub notify_resolved: bool,
}

/// Result of one evaluation: the updated ledger and what to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub ledger: AlertLedger,
    pub dispatches: Vec<Dispatch>,
}

/// Per-fingerprint state machine: absent → active → (re-notified)* →
/// resolved → absent.
///
/// Owns no state between calls; the ledger is passed in and handed back.
#[derive(Debug, Clone, Default)]
pub struct AlertTracker {
    policy: AlertPolicy,
}

impl AlertTracker {
    #[must_use]
    pub const fn new(policy: AlertPolicy) -> Self {
        Self { policy }
    }

    /// Evaluates conditions covering every facet: any active event not among
    /// them resolves.
    #[must_use]
    pub fn evaluate(
        &self,
        ledger: AlertLedger,
        conditions: &[Condition],
        now: DateTime<Utc>,
    ) -> Evaluation {
        self.evaluate_within(ledger, conditions, &Facet::ALL, now)
    }

    /// Like [`Self::evaluate`], but only events of `facets` can resolve. Used by
    /// the fast cadence, which probes a subset of facets.
    #[must_use]
    pub fn evaluate_within(
        &self,
        mut ledger: AlertLedger,
        conditions: &[Condition],
        facets: &[Facet],
        now: DateTime<Utc>,
    ) -> Evaluation {
        let mut dispatches = Vec::new();
        let mut current = BTreeSet::new();

        for condition in conditions {
            let fingerprint = condition.fingerprint();
            if !current.insert(fingerprint.clone()) {
                continue;
            }

            let Some(mut event) = ledger.get(&fingerprint).cloned() else {
                let event = AlertEvent {
                    fingerprint,
                    facet: condition.facet,
                    severity: condition.severity,
                    message: condition.message.clone(),
                    first_seen_at: now,
                    last_seen_at: now,
                    occurrence_count: 1,
                    last_dispatched_at: now,
                    dispatched_occurrence: 1,
                    drift: matches!(condition.kind, ConditionKind::Drift(_)),
                };
                tracing::debug!("New alert {}: {}", event.fingerprint, event.message);
                dispatches.push(Dispatch {
                    reason: DispatchReason::New,
                    event: event.clone(),
                });
                ledger.insert(event);
                continue;
            };

            event.occurrence_count = event.occurrence_count.saturating_add(1);
            event.last_seen_at = now;
            event.message.clone_from(&condition.message);
            let escalated = condition.severity > event.severity;
            event.severity = condition.severity;

            let reason = if escalated {
                Some(DispatchReason::Escalated)
            } else if self.reminder_due(&event, now) {
                Some(DispatchReason::Reminder)
            } else {
                None
            };

            if let Some(reason) = reason {
                event.last_dispatched_at = now;
                event.dispatched_occurrence = event.occurrence_count;
                tracing::debug!("Re-dispatching {} ({reason})", event.fingerprint);
                dispatches.push(Dispatch {
                    reason,
                    event: event.clone(),
                });
            }
            ledger.insert(event);
        }

        let resolved = ledger.take_unless(|event| {
            current.contains(&event.fingerprint) || !facets.contains(&event.facet)
        });
        for event in resolved {
            tracing::debug!("Alert {} resolved", event.fingerprint);
            if self.policy.notify_resolved && !event.drift {
                dispatches.push(Dispatch {
                    reason: DispatchReason::Resolved,
                    event,
                });
            }
        }

        Evaluation { ledger, dispatches }
    }

    fn reminder_due(&self, event: &AlertEvent, now: DateTime<Utc>) -> bool {
        let by_count = self.policy.renotify_after_evaluations.is_some_and(|n| {
            n > 0 && event.occurrence_count.saturating_sub(event.dispatched_occurrence) >= n
        });
        let by_time = self
            .policy
            .renotify_after
            .is_some_and(|after| now - event.last_dispatched_at >= after);
        by_count || by_time
    }
}
