use std::sync::Arc;

use hostdrift::application::services::agent::RunOutcome;
use hostdrift::domain::alerting::AlertPolicy;
use hostdrift::domain::entities::alert::DispatchReason;
use hostdrift::domain::entities::diff::ChangeKind;
use hostdrift::domain::ports::probe::{Probe, ProbeError};
use hostdrift::domain::ports::store::{DiffStore, LedgerStore, SnapshotStore};
use hostdrift::domain::value_objects::{Facet, ProbeStatus};
use hostdrift::infrastructure::persistence::file_store::FileStore;

use crate::common::{FirewallSwitch, Harness, SsFixtureProbe};

fn setup() -> (Harness, Arc<SsFixtureProbe>, Arc<FirewallSwitch>) {
    let ports = SsFixtureProbe::new("ss_baseline.txt");
    let firewall = FirewallSwitch::new(true);
    let probes: Vec<Arc<dyn Probe>> = vec![
        Arc::clone(&ports) as Arc<dyn Probe>,
        Arc::clone(&firewall) as Arc<dyn Probe>,
    ];
    (Harness::new(probes, AlertPolicy::default()), ports, firewall)
}

#[tokio::test]
async fn failed_snapshot_write_commits_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let (harness, ports, _firewall) = setup();

    let baseline = harness.run_full(&store).await;
    let baseline_id = baseline.snapshot_id.expect("baseline id");

    // Archiving the previous snapshot needs the history directory.
    let history = dir.path().join("snapshots").join("history");
    std::fs::write(&history, "blocked").expect("block history");

    ports.load("ss_new_port.txt");
    let report = harness.run_full(&store).await;

    assert!(matches!(report.outcome, RunOutcome::Failed(_)));
    assert_eq!(report.outcome.exit_code(), 1);
    assert_eq!(report.dispatched, 0);
    assert!(harness.notifier.take().is_empty());

    let latest = store.load_latest_snapshot().expect("load").expect("latest");
    assert_eq!(latest.id, baseline_id);
    let diff = store.load_diff().expect("load").expect("diff");
    assert_eq!(diff.to_snapshot_id, baseline_id);
    assert!(store.load_ledger().expect("load ledger").is_empty());
}

#[tokio::test]
async fn corrupted_latest_snapshot_fails_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let (harness, _ports, firewall) = setup();

    harness.run_full(&store).await;
    std::fs::write(dir.path().join("snapshots").join("latest.json"), "{ truncated")
        .expect("corrupt snapshot");

    firewall.set(Ok(false));
    let report = harness.run_full(&store).await;

    assert!(matches!(report.outcome, RunOutcome::Failed(ref reason) if reason.contains("corrupted")));
    assert_eq!(report.dispatched, 0);
    assert!(harness.notifier.take().is_empty());
}

#[tokio::test]
async fn corrupted_ledger_starts_empty_and_realerts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let (harness, _ports, firewall) = setup();

    firewall.set(Ok(false));
    harness.run_full(&store).await;
    assert_eq!(harness.notifier.take().len(), 1);

    std::fs::write(dir.path().join("ledger.json"), "not json at all").expect("corrupt ledger");
    let report = harness.run_full(&store).await;

    assert_eq!(report.outcome, RunOutcome::Success);
    let dispatches = harness.notifier.take();
    assert_eq!(dispatches.len(), 1);
    assert_eq!(dispatches[0].reason, DispatchReason::New);
    assert_eq!(dispatches[0].event.facet, Facet::Firewall);

    let ledger = store.load_ledger().expect("ledger rewritten");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.events().next().map(|e| e.occurrence_count), Some(1));
}

#[tokio::test]
async fn failed_probe_is_partial_and_collapses_in_diff() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let (harness, _ports, firewall) = setup();

    harness.run_full(&store).await;

    firewall.set(Err(ProbeError::ToolMissing("ufw".into())));
    let report = harness.run_full(&store).await;

    assert_eq!(report.outcome, RunOutcome::Partial(vec![Facet::Firewall]));
    assert_eq!(report.outcome.exit_code(), 2);
    assert_eq!(report.outcome.to_string(), "partial (unknown: firewall)");

    let latest = store.load_latest_snapshot().expect("load").expect("latest");
    let result = latest.result(Facet::Firewall).expect("firewall result");
    assert_eq!(result.status, ProbeStatus::Unknown);
    assert_eq!(result.error.as_deref(), Some("required tool missing: ufw"));

    let diff = store.load_diff().expect("load").expect("diff");
    assert_eq!(diff.entries.len(), 1);
    assert_eq!(diff.entries[0].path, "firewall");
    assert_eq!(diff.entries[0].kind, ChangeKind::Changed);

    // Unknown status does not alert unless configured to.
    assert!(harness.notifier.take().is_empty());
}
