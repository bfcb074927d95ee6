pub mod alert;
pub mod diff;
pub mod probe_result;
pub mod snapshot;

pub use alert::{AlertEvent, AlertLedger, Dispatch, DispatchReason};
pub use diff::{ChangeKind, Diff, DiffEntry};
pub use probe_result::{Observation, ProbeResult};
pub use snapshot::{HostMeta, Snapshot};
