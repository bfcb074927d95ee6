use std::sync::Arc;

use hostdrift::application::services::agent::RunOutcome;
use hostdrift::domain::alerting::AlertPolicy;
use hostdrift::domain::entities::alert::DispatchReason;
use hostdrift::domain::ports::probe::Probe;
use hostdrift::domain::ports::store::{LedgerStore, SnapshotStore};
use hostdrift::domain::value_objects::{Facet, Severity};
use hostdrift::infrastructure::persistence::file_store::FileStore;

use crate::common::{FirewallSwitch, GroupFixtureProbe, Harness, SsFixtureProbe};

#[tokio::test]
async fn fast_cadence_alerts_without_new_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let ports = SsFixtureProbe::new("ss_baseline.txt");
    let users = GroupFixtureProbe::new("group_baseline");
    let firewall = FirewallSwitch::new(false);
    let probes: Vec<Arc<dyn Probe>> = vec![
        Arc::clone(&ports) as Arc<dyn Probe>,
        Arc::clone(&users) as Arc<dyn Probe>,
        Arc::clone(&firewall) as Arc<dyn Probe>,
    ];
    let harness = Harness::new(probes, AlertPolicy::default());

    let full = harness.run_full(&store).await;
    let full_id = full.snapshot_id.expect("snapshot id");
    assert_eq!(harness.notifier.take().len(), 1);

    users.load("group_escalated");
    let fast = harness.run_notify(&store, &[Facet::Users]).await;

    assert_eq!(fast.outcome, RunOutcome::Success);
    assert!(fast.snapshot_id.is_none());
    assert_eq!(fast.changes, 1);

    let dispatches = harness.notifier.take();
    assert_eq!(dispatches.len(), 1);
    assert_eq!(dispatches[0].reason, DispatchReason::New);
    assert_eq!(dispatches[0].event.facet, Facet::Users);
    assert_eq!(dispatches[0].event.severity, Severity::Critical);
    assert!(dispatches[0].event.message.contains("sudo_users[mallory] added"));

    // The full snapshot is untouched and the unprobed firewall event survives.
    let latest = store.load_latest_snapshot().expect("load").expect("latest");
    assert_eq!(latest.id, full_id);
    assert!(store.history().expect("history").is_empty());
    let ledger = store.load_ledger().expect("load ledger");
    assert_eq!(ledger.len(), 2);
    assert!(ledger.events().any(|e| e.facet == Facet::Firewall));

    // Repeating the fast cadence does not re-alert.
    let again = harness.run_notify(&store, &[Facet::Users]).await;
    assert_eq!(again.dispatched, 0);
    let ledger = store.load_ledger().expect("load ledger");
    let escalation = ledger
        .events()
        .find(|e| e.facet == Facet::Users)
        .expect("users event");
    assert_eq!(escalation.occurrence_count, 2);
}

#[tokio::test]
async fn fast_cadence_without_enabled_facets_is_a_no_op() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let probes: Vec<Arc<dyn Probe>> = vec![SsFixtureProbe::new("ss_baseline.txt") as Arc<dyn Probe>];
    let harness = Harness::new(probes, AlertPolicy::default());

    let report = harness.run_notify(&store, &[Facet::Users]).await;

    assert_eq!(report.outcome, RunOutcome::Success);
    assert_eq!(report.dispatched, 0);
    assert!(store.load_latest_snapshot().expect("load").is_none());
}

#[tokio::test]
async fn fast_cadence_before_any_full_run_has_no_drift() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let users = GroupFixtureProbe::new("group_escalated");
    let probes: Vec<Arc<dyn Probe>> = vec![Arc::clone(&users) as Arc<dyn Probe>];
    let harness = Harness::new(probes, AlertPolicy::default());

    let report = harness.run_notify(&store, &[Facet::Users]).await;

    assert_eq!(report.outcome, RunOutcome::Success);
    assert_eq!(report.changes, 0);
    assert!(harness.notifier.take().is_empty());
}
