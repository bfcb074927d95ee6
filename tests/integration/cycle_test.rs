use std::sync::Arc;

use hostdrift::application::services::agent::RunOutcome;
use hostdrift::domain::alerting::AlertPolicy;
use hostdrift::domain::entities::alert::DispatchReason;
use hostdrift::domain::entities::diff::ChangeKind;
use hostdrift::domain::ports::probe::Probe;
use hostdrift::domain::ports::store::{DiffStore, LedgerStore, SnapshotStore};
use hostdrift::domain::value_objects::{Facet, Severity};
use hostdrift::infrastructure::persistence::file_store::FileStore;

use crate::common::{FirewallSwitch, Harness, SsFixtureProbe};

fn setup(policy: AlertPolicy) -> (Harness, Arc<SsFixtureProbe>, Arc<FirewallSwitch>) {
    let ports = SsFixtureProbe::new("ss_baseline.txt");
    let firewall = FirewallSwitch::new(true);
    let probes: Vec<Arc<dyn Probe>> = vec![
        Arc::clone(&ports) as Arc<dyn Probe>,
        Arc::clone(&firewall) as Arc<dyn Probe>,
    ];
    (Harness::new(probes, policy), ports, firewall)
}

#[tokio::test]
async fn first_run_records_a_baseline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let (harness, _ports, _firewall) = setup(AlertPolicy::default());

    let report = harness.run_full(&store).await;

    assert_eq!(report.outcome, RunOutcome::Success);
    assert_eq!(report.outcome.exit_code(), 0);
    assert_eq!(report.changes, 0);
    assert_eq!(report.dispatched, 0);

    let latest = store
        .load_latest_snapshot()
        .expect("load")
        .expect("snapshot stored");
    assert_eq!(Some(latest.id.clone()), report.snapshot_id);
    assert_eq!(latest.host_meta.hostname, "web-01");
    assert_eq!(latest.facets().collect::<Vec<_>>(), vec![Facet::Firewall, Facet::Ports]);

    let diff = store.load_diff().expect("load").expect("diff stored");
    assert!(diff.from_snapshot_id.is_none());
    assert!(diff.is_empty());
    assert!(harness.notifier.take().is_empty());
}

#[tokio::test]
async fn drift_alerts_once_then_resolves() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let (harness, ports, firewall) = setup(AlertPolicy::default());

    let baseline = harness.run_full(&store).await;

    ports.load("ss_new_port.txt");
    firewall.set(Ok(false));
    let drifted = harness.run_full(&store).await;
    assert_eq!(drifted.outcome, RunOutcome::Success);
    assert_eq!(drifted.changes, 2);

    let diff = store.load_diff().expect("load").expect("diff stored");
    assert_eq!(diff.from_snapshot_id, baseline.snapshot_id);
    let paths: Vec<(&str, ChangeKind)> = diff
        .entries
        .iter()
        .map(|e| (e.path.as_str(), e.kind))
        .collect();
    assert_eq!(
        paths,
        vec![
            ("enabled", ChangeKind::Changed),
            ("ports[2222/tcp]", ChangeKind::Added),
        ]
    );

    let dispatches = harness.notifier.take();
    assert_eq!(dispatches.len(), 3);
    assert!(dispatches.iter().all(|d| d.reason == DispatchReason::New));
    let ports_alert = dispatches
        .iter()
        .find(|d| d.event.facet == Facet::Ports)
        .expect("ports alert");
    assert_eq!(ports_alert.event.severity, Severity::Warning);
    assert!(ports_alert.event.message.contains("ports[2222/tcp] added"));
    let critical = dispatches
        .iter()
        .filter(|d| d.event.severity == Severity::Critical)
        .count();
    assert_eq!(critical, 2);

    // Same state again: drift is gone, the inactive firewall persists.
    let steady = harness.run_full(&store).await;
    assert_eq!(steady.changes, 0);
    assert_eq!(steady.dispatched, 0);
    assert!(harness.notifier.take().is_empty());

    let ledger = store.load_ledger().expect("load ledger");
    assert_eq!(ledger.len(), 1);
    let event = ledger.events().next().expect("status event");
    assert_eq!(event.facet, Facet::Firewall);
    assert_eq!(event.occurrence_count, 2);
}

#[tokio::test]
async fn resolution_is_announced_when_enabled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let policy = AlertPolicy {
        notify_resolved: true,
        ..AlertPolicy::default()
    };
    let (harness, _ports, firewall) = setup(policy);

    firewall.set(Ok(false));
    harness.run_full(&store).await;
    assert_eq!(harness.notifier.take().len(), 1);

    firewall.set(Ok(true));
    let report = harness.run_full(&store).await;
    let dispatches = harness.notifier.take();
    // The re-enable drift matches a warning rule; the status condition clears.
    assert_eq!(report.dispatched, dispatches.len());
    assert!(dispatches
        .iter()
        .any(|d| d.reason == DispatchReason::Resolved && d.event.facet == Facet::Firewall));
    assert!(dispatches
        .iter()
        .any(|d| d.reason == DispatchReason::New && d.event.message.contains("enabled changed")));

    // The firewall stays enabled: the change clears without a resolution notice.
    let steady = harness.run_full(&store).await;
    assert_eq!(steady.dispatched, 0);
    assert!(harness.notifier.take().is_empty());
    assert!(store.load_ledger().expect("load ledger").is_empty());
}

#[tokio::test]
async fn open_port_is_not_announced_as_resolved() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let policy = AlertPolicy {
        notify_resolved: true,
        ..AlertPolicy::default()
    };
    let (harness, ports, _firewall) = setup(policy);

    harness.run_full(&store).await;
    ports.load("ss_new_port.txt");
    harness.run_full(&store).await;
    let opened = harness.notifier.take();
    assert!(opened
        .iter()
        .any(|d| d.reason == DispatchReason::New && d.event.message.contains("ports[2222/tcp]")));

    harness.run_full(&store).await;
    let after = harness.notifier.take();
    assert!(
        after.iter().all(|d| d.reason != DispatchReason::Resolved),
        "unexpected notices: {after:?}"
    );
}

#[tokio::test]
async fn repeated_condition_reminds_on_cadence() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let policy = AlertPolicy {
        renotify_after_evaluations: Some(3),
        ..AlertPolicy::default()
    };
    let (harness, _ports, firewall) = setup(policy);
    firewall.set(Ok(false));

    let mut reasons = Vec::new();
    for _ in 0..5 {
        harness.run_full(&store).await;
        reasons.extend(harness.notifier.take().into_iter().map(|d| d.reason));
    }

    assert_eq!(reasons, vec![DispatchReason::New, DispatchReason::Reminder]);
    let ledger = store.load_ledger().expect("load ledger");
    assert_eq!(
        ledger.events().next().map(|e| e.occurrence_count),
        Some(5)
    );
}

#[tokio::test]
async fn history_keeps_previous_snapshots() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let (harness, ports, _firewall) = setup(AlertPolicy::default());

    let first = harness.run_full(&store).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    ports.load("ss_new_port.txt");
    harness.run_full(&store).await;

    let history = store.history().expect("history");
    assert_eq!(history, vec![first.snapshot_id.expect("id")]);
}
