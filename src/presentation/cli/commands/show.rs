use anyhow::Context;
use serde::Serialize;

use crate::domain::ports::store::{DiffStore, LedgerStore, SnapshotStore};
use crate::infrastructure::persistence::file_store::FileStore;
use crate::presentation::cli::app::ShowTarget;

/// Renders a stored artifact as pretty JSON. `None` when nothing is stored.
///
/// # Errors
///
/// Returns an error if the artifact cannot be read or is corrupted.
pub fn render(store: &FileStore, what: ShowTarget, id: Option<&str>) -> anyhow::Result<Option<String>> {
    match what {
        ShowTarget::Snapshot => {
            let snapshot = match id {
                Some(id) => store.load_archived(id),
                None => store.load_latest_snapshot(),
            }
            .context("Failed to load snapshot")?;
            snapshot.as_ref().map(to_json).transpose()
        }
        ShowTarget::Diff => {
            let diff = match id {
                Some(id) => store.load_archived_diff(id),
                None => store.load_diff(),
            }
            .context("Failed to load diff")?;
            diff.as_ref().map(to_json).transpose()
        }
        ShowTarget::Ledger => {
            let ledger = store.load_ledger().context("Failed to load alert ledger")?;
            to_json(&ledger).map(Some)
        }
        ShowTarget::History => {
            let mut snapshots = store.history().context("Failed to list snapshot history")?;
            if let Some(latest) = store.load_latest_snapshot().context("Failed to load snapshot")? {
                snapshots.push(latest.id);
            }
            let diffs = store.diff_history().context("Failed to list diff history")?;
            to_json(&serde_json::json!({ "snapshots": snapshots, "diffs": diffs })).map(Some)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize artifact")
}

/// Prints a stored artifact; the read-only reporting path.
///
/// # Errors
///
/// Returns an error if the artifact cannot be read or is corrupted.
pub fn run_show(store: &FileStore, what: ShowTarget, id: Option<&str>) -> anyhow::Result<()> {
    match render(store, what, id)? {
        Some(json) => println!("{json}"),
        None => eprintln!("Nothing stored yet in {}", store.root().display()),
    }
    Ok(())
}
