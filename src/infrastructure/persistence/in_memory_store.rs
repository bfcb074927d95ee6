use std::sync::Mutex;

use crate::domain::entities::alert::AlertLedger;
use crate::domain::entities::diff::Diff;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::ports::store::{DiffStore, LedgerStore, SnapshotStore, StoreError};

/// In-memory store for testing purposes. Keeps every stored snapshot.
pub struct InMemoryStore {
    snapshots: Mutex<Vec<Snapshot>>,
    diff: Mutex<Option<Diff>>,
    ledger: Mutex<Option<AlertLedger>>,
}

impl InMemoryStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            snapshots: Mutex::new(Vec::new()),
            diff: Mutex::new(None),
            ledger: Mutex::new(None),
        }
    }

    /// Number of snapshots stored so far.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the lock is poisoned.
    pub fn snapshot_count(&self) -> Result<usize, StoreError> {
        Ok(self
            .snapshots
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for InMemoryStore {
    fn load_latest_snapshot(&self) -> Result<Option<Snapshot>, StoreError> {
        Ok(self
            .snapshots
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .last()
            .cloned())
    }

    fn store_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.snapshots
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?
            .push(snapshot.clone());
        Ok(())
    }
}

impl DiffStore for InMemoryStore {
    fn load_diff(&self) -> Result<Option<Diff>, StoreError> {
        Ok(self
            .diff
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .clone())
    }

    fn store_diff(&self, diff: &Diff) -> Result<(), StoreError> {
        *self
            .diff
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))? = Some(diff.clone());
        Ok(())
    }
}

impl LedgerStore for InMemoryStore {
    fn load_ledger(&self) -> Result<AlertLedger, StoreError> {
        Ok(self
            .ledger
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .clone()
            .unwrap_or_default())
    }

    fn store_ledger(&self, ledger: &AlertLedger) -> Result<(), StoreError> {
        *self
            .ledger
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))? = Some(ledger.clone());
        Ok(())
    }
}
