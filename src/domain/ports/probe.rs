use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::domain::entities::probe_result::{Observation, ProbeResult};
use crate::domain::value_objects::{Facet, ProbeSettings};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("required tool missing: {0}")]
    ToolMissing(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("cancelled at run deadline")]
    DeadlineExceeded,
    #[error("probe aborted: {0}")]
    Aborted(String),
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ProbeError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(e.to_string()),
            std::io::ErrorKind::NotFound => Self::ToolMissing(e.to_string()),
            _ => Self::Io(e.to_string()),
        }
    }
}

/// Everything a probe may consult while collecting.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    /// Whether the agent runs with an effective uid of 0.
    pub privileged: bool,
    pub timeout: Duration,
    pub settings: Arc<ProbeSettings>,
}

impl ProbeContext {
    #[must_use]
    pub fn new(privileged: bool, timeout: Duration, settings: ProbeSettings) -> Self {
        Self {
            privileged,
            timeout,
            settings: Arc::new(settings),
        }
    }
}

/// Inspects one facet of host state. Probes only read; they never change
/// the system they observe.
#[async_trait]
pub trait Probe: Send + Sync {
    fn facet(&self) -> Facet;

    /// Collect the facet's current state.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` when the data cannot be collected (missing tool,
    /// permission denied, failing command).
    async fn collect(&self, ctx: &ProbeContext) -> Result<Observation, ProbeError>;

    /// Collects and stamps the result. A failed collection becomes an
    /// `unknown` result carrying the error instead of propagating it.
    async fn run(&self, ctx: &ProbeContext) -> ProbeResult {
        let facet = self.facet();
        match self.collect(ctx).await {
            Ok(observation) => ProbeResult::from_observation(facet, observation, Utc::now()),
            Err(e) => {
                tracing::warn!("Probe {facet} failed: {e}");
                ProbeResult::failed(facet, &e, Utc::now())
            }
        }
    }
}
