use thiserror::Error;

use crate::domain::entities::alert::AlertLedger;
use crate::domain::entities::diff::Diff;
use crate::domain::entities::snapshot::Snapshot;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage read failed: {0}")]
    ReadFailed(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("stored artifact is corrupted: {0}")]
    Corrupted(String),
    #[error("another run holds the lock: {0}")]
    LockHeld(String),
}

pub trait SnapshotStore: Send + Sync {
    /// Load the most recent committed snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the artifact cannot be read or parsed.
    fn load_latest_snapshot(&self) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the latest snapshot, archiving the previous one into history
    /// and applying the retention policy. Readers never observe a partially
    /// written artifact.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails; the previous latest snapshot
    /// is then left untouched.
    fn store_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

pub trait DiffStore: Send + Sync {
    /// Load the most recent diff, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the artifact cannot be read or parsed.
    fn load_diff(&self) -> Result<Option<Diff>, StoreError>;

    /// Atomically replace the latest diff.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    fn store_diff(&self, diff: &Diff) -> Result<(), StoreError>;
}

pub trait LedgerStore: Send + Sync {
    /// Load the alert ledger. A missing ledger is an empty one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupted` if the stored ledger is malformed,
    /// `StoreError::ReadFailed` if it cannot be read.
    fn load_ledger(&self) -> Result<AlertLedger, StoreError>;

    /// Atomically replace the alert ledger.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    fn store_ledger(&self, ledger: &AlertLedger) -> Result<(), StoreError>;
}
