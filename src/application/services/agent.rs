use chrono::Utc;

use super::registry::ProbeRegistry;
use super::snapshot_builder::build_snapshot;
use crate::domain::alerting::{AlertTracker, ConditionEngine};
use crate::domain::diff::{baseline_diff, diff_snapshots};
use crate::domain::entities::alert::{AlertLedger, Dispatch};
use crate::domain::entities::snapshot::HostMeta;
use crate::domain::ports::notifier::Notifier;
use crate::domain::ports::probe::ProbeContext;
use crate::domain::ports::store::{DiffStore, LedgerStore, SnapshotStore, StoreError};
use crate::domain::value_objects::Facet;

/// Overall result of one run, reported to the invoker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// Every artifact was committed but some probes reported `unknown`.
    Partial(Vec<Facet>),
    /// An artifact could not be loaded or persisted.
    Failed(String),
}

impl RunOutcome {
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Partial(_) => 2,
            Self::Failed(_) => 1,
        }
    }

    fn from_run(failures: Vec<String>, unknown: Vec<Facet>) -> Self {
        if !failures.is_empty() {
            Self::Failed(failures.join("; "))
        } else if !unknown.is_empty() {
            Self::Partial(unknown)
        } else {
            Self::Success
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial(facets) => {
                let names: Vec<&str> = facets.iter().map(Facet::as_str).collect();
                write!(f, "partial (unknown: {})", names.join(", "))
            }
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub snapshot_id: Option<String>,
    pub changes: usize,
    pub dispatched: usize,
}

impl RunReport {
    fn failed(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::error!("Run failed: {reason}");
        Self {
            outcome: RunOutcome::Failed(reason),
            snapshot_id: None,
            changes: 0,
            dispatched: 0,
        }
    }
}

/// Orchestrates a run: probe → build snapshot → diff → evaluate alerts →
/// persist → dispatch.
pub struct AgentService<'a> {
    registry: &'a ProbeRegistry,
    ctx: &'a ProbeContext,
    host_meta: &'a HostMeta,
    conditions: &'a ConditionEngine,
    tracker: &'a AlertTracker,
    snapshots: &'a dyn SnapshotStore,
    diffs: &'a dyn DiffStore,
    ledger: &'a dyn LedgerStore,
    notifier: &'a dyn Notifier,
}

impl<'a> AgentService<'a> {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: &'a ProbeRegistry,
        ctx: &'a ProbeContext,
        host_meta: &'a HostMeta,
        conditions: &'a ConditionEngine,
        tracker: &'a AlertTracker,
        snapshots: &'a dyn SnapshotStore,
        diffs: &'a dyn DiffStore,
        ledger: &'a dyn LedgerStore,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            registry,
            ctx,
            host_meta,
            conditions,
            tracker,
            snapshots,
            diffs,
            ledger,
            notifier,
        }
    }

    /// Full cadence: every enabled probe, diff against the latest snapshot,
    /// persist snapshot, diff and ledger, then dispatch.
    ///
    /// The snapshot write is the commit point. If it fails nothing else is
    /// written or sent. Later write failures still dispatch and fail the run.
    pub async fn run_full(&self) -> RunReport {
        let results = self.registry.run_all(self.ctx).await;
        let now = Utc::now();
        let snapshot = build_snapshot(now, self.host_meta.clone(), results);
        let unknown = snapshot.unknown_facets();
        tracing::info!(
            "Collected {} facet(s), {} unknown",
            snapshot.results.len(),
            unknown.len()
        );

        let previous = match self.snapshots.load_latest_snapshot() {
            Ok(previous) => previous,
            Err(e) => return RunReport::failed(format!("cannot load previous snapshot: {e}")),
        };
        let diff = previous.as_ref().map_or_else(
            || {
                tracing::info!("No previous snapshot, recording baseline");
                baseline_diff(&snapshot)
            },
            |previous| diff_snapshots(previous, &snapshot),
        );
        if !diff.is_empty() {
            tracing::info!("Detected {} change(s)", diff.entries.len());
        }

        let conditions = self.conditions.derive(&snapshot, Some(&diff));
        let evaluation = self.tracker.evaluate(self.load_ledger(), &conditions, now);

        if let Err(e) = self.snapshots.store_snapshot(&snapshot) {
            return RunReport::failed(format!("cannot store snapshot: {e}"));
        }

        let mut failures = Vec::new();
        if let Err(e) = self.diffs.store_diff(&diff) {
            tracing::error!("Failed to store diff: {e}");
            failures.push(format!("cannot store diff: {e}"));
        }
        if let Err(e) = self.ledger.store_ledger(&evaluation.ledger) {
            tracing::error!("Failed to store alert ledger: {e}");
            failures.push(format!("cannot store ledger: {e}"));
        }

        let dispatched = self.dispatch(&evaluation.dispatches);

        RunReport {
            outcome: RunOutcome::from_run(failures, unknown),
            snapshot_id: Some(snapshot.id),
            changes: diff.entries.len(),
            dispatched,
        }
    }

    /// Fast cadence: only the probes of `facets`, compared against the latest
    /// full snapshot restricted to those facets. Only the ledger is persisted;
    /// events of other facets are left untouched.
    pub async fn run_notify(&self, facets: &[Facet]) -> RunReport {
        let registry = self.registry.restricted_to(facets);
        let facets = registry.facets();
        if facets.is_empty() {
            tracing::info!("No enabled facet to evaluate");
            return RunReport {
                outcome: RunOutcome::Success,
                snapshot_id: None,
                changes: 0,
                dispatched: 0,
            };
        }

        let results = registry.run_all(self.ctx).await;
        let now = Utc::now();
        let snapshot = build_snapshot(now, self.host_meta.clone(), results);
        let unknown = snapshot.unknown_facets();

        let previous = match self.snapshots.load_latest_snapshot() {
            Ok(previous) => previous,
            Err(e) => return RunReport::failed(format!("cannot load latest snapshot: {e}")),
        };
        let diff = previous
            .map(|previous| diff_snapshots(&previous.restricted_to(&facets), &snapshot));
        let changes = diff.as_ref().map_or(0, |d| d.entries.len());

        let conditions = self.conditions.derive(&snapshot, diff.as_ref());
        let evaluation = self
            .tracker
            .evaluate_within(self.load_ledger(), &conditions, &facets, now);

        let mut failures = Vec::new();
        if let Err(e) = self.ledger.store_ledger(&evaluation.ledger) {
            tracing::error!("Failed to store alert ledger: {e}");
            failures.push(format!("cannot store ledger: {e}"));
        }

        let dispatched = self.dispatch(&evaluation.dispatches);

        RunReport {
            outcome: RunOutcome::from_run(failures, unknown),
            snapshot_id: None,
            changes,
            dispatched,
        }
    }

    /// A ledger that cannot be read or parsed is replaced by an empty one:
    /// active conditions re-alert once instead of monitoring stopping.
    fn load_ledger(&self) -> AlertLedger {
        match self.ledger.load_ledger() {
            Ok(ledger) => ledger,
            Err(StoreError::Corrupted(e)) => {
                tracing::warn!("Alert ledger is corrupted, starting empty: {e}");
                AlertLedger::new()
            }
            Err(e) => {
                tracing::warn!("Alert ledger unreadable, starting empty: {e}");
                AlertLedger::new()
            }
        }
    }

    fn dispatch(&self, dispatches: &[Dispatch]) -> usize {
        for dispatch in dispatches {
            if let Err(e) = self.notifier.notify(dispatch) {
                tracing::warn!(
                    "Dispatch of {} ({}) failed: {e}",
                    dispatch.event.fingerprint,
                    dispatch.reason
                );
            }
        }
        if !dispatches.is_empty() {
            tracing::info!("Dispatched {} alert(s)", dispatches.len());
        }
        dispatches.len()
    }
}
