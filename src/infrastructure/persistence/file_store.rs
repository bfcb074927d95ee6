use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::domain::entities::alert::AlertLedger;
use crate::domain::entities::diff::Diff;
use crate::domain::entities::snapshot::{parse_snapshot_id, Snapshot};
use crate::domain::ports::store::{DiffStore, LedgerStore, SnapshotStore, StoreError};

/// JSON artifacts under a state directory:
///
/// ```text
/// snapshots/latest.json
/// snapshots/history/<snapshot id>.json
/// diffs/latest.json
/// ledger.json
/// ```
///
/// Every write goes to a temporary file in the target directory which is
/// synced and then renamed over the destination, so readers see either the
/// old artifact or the new one.
pub struct FileStore {
    root: PathBuf,
    max_snapshots: usize,
    max_age: TimeDelta,
}

impl FileStore {
    /// Store rooted at `root` (with `~` expanded). Retention defaults to
    /// 200 snapshots and 30 days.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        let expanded = shellexpand::tilde(&root.to_string_lossy()).into_owned();
        Self {
            root: PathBuf::from(expanded),
            max_snapshots: 200,
            max_age: TimeDelta::days(30),
        }
    }

    /// Keep at most `max_snapshots` snapshots (latest included), none older
    /// than `max_age` relative to the newest one.
    #[must_use]
    pub fn with_retention(mut self, max_snapshots: usize, max_age: TimeDelta) -> Self {
        self.max_snapshots = max_snapshots.max(1);
        self.max_age = max_age;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn latest_snapshot_path(&self) -> PathBuf {
        self.root.join("snapshots").join("latest.json")
    }

    fn history_dir(&self) -> PathBuf {
        self.root.join("snapshots").join("history")
    }

    fn diff_path(&self) -> PathBuf {
        self.root.join("diffs").join("latest.json")
    }

    fn ledger_path(&self) -> PathBuf {
        self.root.join("ledger.json")
    }

    fn diff_history_dir(&self) -> PathBuf {
        self.root.join("diffs").join("history")
    }

    /// Ids of archived snapshots, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the history directory exists but
    /// cannot be listed.
    pub fn history(&self) -> Result<Vec<String>, StoreError> {
        list_ids(&self.history_dir())
    }

    /// Ids of archived diffs (the snapshot each diff leads to), oldest first.
    /// The latest diff is archived too.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the directory cannot be listed.
    pub fn diff_history(&self) -> Result<Vec<String>, StoreError> {
        list_ids(&self.diff_history_dir())
    }

    /// Load one archived snapshot by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the artifact cannot be read or parsed.
    pub fn load_archived(&self, id: &str) -> Result<Option<Snapshot>, StoreError> {
        read_json(&self.history_dir().join(format!("{id}.json")))
    }

    /// Load the diff that led to snapshot `id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the artifact cannot be read or parsed.
    pub fn load_archived_diff(&self, id: &str) -> Result<Option<Diff>, StoreError> {
        read_json(&self.diff_history_dir().join(format!("{id}.json")))
    }

    /// Copies the current latest snapshot into history under its own id.
    fn archive_latest(&self) -> Result<(), StoreError> {
        let previous = match read_json::<Snapshot>(&self.latest_snapshot_path()) {
            Ok(Some(previous)) => previous,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::warn!("Not archiving unreadable latest snapshot: {e}");
                return Ok(());
            }
        };
        write_json(
            &self.history_dir().join(format!("{}.json", previous.id)),
            &previous,
        )
    }

    /// Drops archived artifacts in `dir` beyond `keep` or older than the age
    /// limit relative to `newest`. Failures are logged; retention never fails
    /// a run.
    fn prune(&self, dir: &Path, keep: usize, newest: DateTime<Utc>) {
        let ids = match list_ids(dir) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Skipping retention in {}: {e}", dir.display());
                return;
            }
        };
        let cutoff = newest - self.max_age;
        let excess = ids.len().saturating_sub(keep);

        for (index, id) in ids.iter().enumerate() {
            let too_old = parse_snapshot_id(id).is_some_and(|at| at < cutoff);
            if index < excess || too_old {
                let path = dir.join(format!("{id}.json"));
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!("Failed to prune {}: {e}", path.display());
                } else {
                    tracing::debug!("Pruned {}", path.display());
                }
            }
        }
    }
}

/// Snapshot ids of the `<id>.json` artifacts in `dir`, oldest first.
fn list_ids(dir: &Path) -> Result<Vec<String>, StoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::ReadFailed(format!("{}: {e}", dir.display()))),
    };
    let mut ids: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.strip_suffix(".json")
                .filter(|id| parse_snapshot_id(id).is_some())
                .map(ToString::to_string)
        })
        .collect();
    ids.sort();
    Ok(ids)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::ReadFailed(format!("{}: {e}", path.display()))),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| StoreError::Corrupted(format!("{}: {e}", path.display())))
}

fn write_failed(path: &Path, e: impl std::fmt::Display) -> StoreError {
    StoreError::WriteFailed(format!("{}: {e}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .ok_or_else(|| write_failed(path, "no parent directory"))?;
    std::fs::create_dir_all(dir).map_err(|e| write_failed(path, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_failed(path, e))?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(|e| write_failed(path, e))?;
    tmp.write_all(b"\n").map_err(|e| write_failed(path, e))?;
    tmp.as_file().sync_all().map_err(|e| write_failed(path, e))?;
    tmp.persist(path).map_err(|e| write_failed(path, e.error))?;
    Ok(())
}

impl SnapshotStore for FileStore {
    fn load_latest_snapshot(&self) -> Result<Option<Snapshot>, StoreError> {
        read_json(&self.latest_snapshot_path())
    }

    fn store_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.archive_latest()?;
        write_json(&self.latest_snapshot_path(), snapshot)?;
        tracing::debug!("Stored snapshot {}", snapshot.id);
        // The latest snapshot counts towards the limit.
        self.prune(
            &self.history_dir(),
            self.max_snapshots.saturating_sub(1),
            snapshot.created_at,
        );
        Ok(())
    }
}

impl DiffStore for FileStore {
    fn load_diff(&self) -> Result<Option<Diff>, StoreError> {
        read_json(&self.diff_path())
    }

    /// Writes `diffs/latest.json` and archives the same diff under the id
    /// of the snapshot it leads to, with the snapshot retention limits.
    fn store_diff(&self, diff: &Diff) -> Result<(), StoreError> {
        write_json(&self.diff_path(), diff)?;
        write_json(
            &self
                .diff_history_dir()
                .join(format!("{}.json", diff.to_snapshot_id)),
            diff,
        )?;
        self.prune(&self.diff_history_dir(), self.max_snapshots, diff.created_at);
        Ok(())
    }
}

impl LedgerStore for FileStore {
    fn load_ledger(&self) -> Result<AlertLedger, StoreError> {
        Ok(read_json(&self.ledger_path())?.unwrap_or_default())
    }

    fn store_ledger(&self, ledger: &AlertLedger) -> Result<(), StoreError> {
        write_json(&self.ledger_path(), ledger)
    }
}
