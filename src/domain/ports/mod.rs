pub mod notifier;
pub mod probe;
pub mod store;

pub use notifier::{NotificationError, Notifier};
pub use probe::{Probe, ProbeContext, ProbeError};
pub use store::{DiffStore, LedgerStore, SnapshotStore, StoreError};
