use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::probe_result::ProbeResult;
use crate::domain::value_objects::Facet;

const SNAPSHOT_ID_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

/// Identity of the host a snapshot was taken on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMeta {
    pub hostname: String,
    pub kernel_version: String,
    pub agent_version: String,
}

/// Point-in-time aggregation of every enabled probe's result.
///
/// Holds exactly one result per enabled facet; a disabled facet is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub host_meta: HostMeta,
    pub results: BTreeMap<Facet, ProbeResult>,
}

impl Snapshot {
    #[must_use]
    pub fn result(&self, facet: Facet) -> Option<&ProbeResult> {
        self.results.get(&facet)
    }

    pub fn facets(&self) -> impl Iterator<Item = Facet> + '_ {
        self.results.keys().copied()
    }

    /// Facets whose probe failed during this run.
    #[must_use]
    pub fn unknown_facets(&self) -> Vec<Facet> {
        self.results
            .values()
            .filter(|r| r.is_failed())
            .map(|r| r.facet)
            .collect()
    }

    /// Copy of this snapshot keeping only the given facets.
    #[must_use]
    pub fn restricted_to(&self, facets: &[Facet]) -> Self {
        Self {
            id: self.id.clone(),
            created_at: self.created_at,
            host_meta: self.host_meta.clone(),
            results: self
                .results
                .iter()
                .filter(|(facet, _)| facets.contains(facet))
                .map(|(facet, result)| (*facet, result.clone()))
                .collect(),
        }
    }
}

/// Timestamp-derived snapshot id, sortable as a string.
#[must_use]
pub fn snapshot_id(created_at: DateTime<Utc>) -> String {
    created_at.format(SNAPSHOT_ID_FORMAT).to_string()
}

/// Recovers the creation time encoded in a snapshot id.
#[must_use]
pub fn parse_snapshot_id(id: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(id, SNAPSHOT_ID_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
