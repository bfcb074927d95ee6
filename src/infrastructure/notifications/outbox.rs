use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::entities::alert::Dispatch;
use crate::domain::ports::notifier::{NotificationError, Notifier};

/// Appends every dispatch as one JSON line to an outbox file, read by the
/// chat-bot relay. Entries carry the fingerprint so the reader can
/// deduplicate retried deliveries.
///
/// Once the file reaches `max_bytes` it is renamed to `<outbox>.1`
/// (replacing the previous generation) and a fresh file is started, so at
/// most two generations exist on disk.
///
/// `reason` is `resolved` only for status conditions that cleared. Drift
/// events (a new port, a new sudo user) are never announced as resolved:
/// they describe a change that happened, not a state that can recover.
pub struct OutboxNotifier {
    path: PathBuf,
    max_bytes: u64,
}

impl OutboxNotifier {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        Self {
            path: PathBuf::from(expanded),
            max_bytes: 1024 * 1024,
        }
    }

    /// Size at which the outbox rotates. Zero disables rotation.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn rotated_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".1");
        PathBuf::from(name)
    }

    fn rotate_if_full(&self) -> Result<(), NotificationError> {
        if self.max_bytes == 0 {
            return Ok(());
        }
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(NotificationError::ChannelUnavailable(format!(
                    "{}: {e}",
                    self.path.display()
                )))
            }
        };
        if size < self.max_bytes {
            return Ok(());
        }
        let rotated = self.rotated_path();
        std::fs::rename(&self.path, &rotated).map_err(|e| {
            NotificationError::ChannelUnavailable(format!("{}: {e}", rotated.display()))
        })?;
        tracing::debug!("Rotated outbox to {} at {size} bytes", rotated.display());
        Ok(())
    }

    fn append_json_line(&self, value: &serde_json::Value) -> Result<(), NotificationError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NotificationError::ChannelUnavailable(format!("{}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string(value)
            .map_err(|e| NotificationError::SendFailed(format!("JSON serialization: {e}")))?;
        self.rotate_if_full()?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                NotificationError::ChannelUnavailable(format!("{}: {e}", self.path.display()))
            })?;

        writeln!(file, "{json}")
            .map_err(|e| NotificationError::SendFailed(format!("{}: {e}", self.path.display())))
    }
}

impl Notifier for OutboxNotifier {
    fn notify(&self, dispatch: &Dispatch) -> Result<(), NotificationError> {
        let event = &dispatch.event;
        let entry = serde_json::json!({
            "fingerprint": event.fingerprint,
            "facet": event.facet,
            "severity": event.severity,
            "reason": dispatch.reason,
            "message": event.message,
            "first_seen_at": event.first_seen_at.to_rfc3339(),
            "last_seen_at": event.last_seen_at.to_rfc3339(),
            "occurrence_count": event.occurrence_count,
        });

        self.append_json_line(&entry)
    }
}
