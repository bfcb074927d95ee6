use crate::domain::entities::alert::{Dispatch, DispatchReason};
use crate::domain::ports::notifier::{NotificationError, Notifier};
use crate::domain::value_objects::Severity;

/// Forwards dispatches to multiple notifiers.
///
/// Calls each notifier in order, collecting errors.
/// Returns the first error encountered (if any), but always calls all notifiers.
/// Dispatches below `min_severity` are dropped, except resolutions, which
/// follow the severity the event had while active.
pub struct CompositeNotifier {
    notifiers: Vec<Box<dyn Notifier>>,
    min_severity: Severity,
}

impl CompositeNotifier {
    #[must_use]
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self {
            notifiers,
            min_severity: Severity::Warning,
        }
    }

    #[must_use]
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for CompositeNotifier {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Notifier for CompositeNotifier {
    fn notify(&self, dispatch: &Dispatch) -> Result<(), NotificationError> {
        if dispatch.event.severity < self.min_severity {
            tracing::debug!(
                fingerprint = %dispatch.event.fingerprint,
                "Below minimum severity, not notifying"
            );
            return Ok(());
        }
        if dispatch.reason == DispatchReason::Resolved {
            tracing::info!("Resolved: {}", dispatch.event.message);
        }

        let mut first_error = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(dispatch) {
                tracing::warn!("Notification failed: {e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
