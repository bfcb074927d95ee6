use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Facet, FieldMap, ProbeStatus};

/// Schema version assumed for artifacts written before the field existed.
const fn default_schema() -> u32 {
    1
}

/// What a probe observed, before it is stamped with facet and time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub status: ProbeStatus,
    pub details: String,
    pub data: FieldMap,
    /// Version of the facet's `data` layout.
    pub schema: u32,
}

impl Observation {
    #[must_use]
    pub fn new(status: ProbeStatus, details: impl Into<String>, data: FieldMap) -> Self {
        Self {
            status,
            details: details.into(),
            data,
            schema: default_schema(),
        }
    }
}

/// Result of one probe run for one facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub facet: Facet,
    pub status: ProbeStatus,
    pub details: String,
    pub data: FieldMap,
    pub collected_at: DateTime<Utc>,
    /// Set when the probe itself failed; `status` is then `Unknown`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default = "default_schema")]
    pub schema: u32,
}

impl ProbeResult {
    #[must_use]
    pub fn from_observation(
        facet: Facet,
        observation: Observation,
        collected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            facet,
            status: observation.status,
            details: observation.details,
            data: observation.data,
            collected_at,
            error: None,
            schema: observation.schema,
        }
    }

    /// Result recorded for a probe that could not complete.
    #[must_use]
    pub fn failed(
        facet: Facet,
        error: &impl std::fmt::Display,
        collected_at: DateTime<Utc>,
    ) -> Self {
        let error = error.to_string();
        Self {
            facet,
            status: ProbeStatus::Unknown,
            details: format!("probe failed: {error}"),
            data: FieldMap::new(),
            collected_at,
            error: Some(error),
            schema: default_schema(),
        }
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, ProbeStatus::Unknown)
    }
}
