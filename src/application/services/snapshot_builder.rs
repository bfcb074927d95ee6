use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::entities::probe_result::ProbeResult;
use crate::domain::entities::snapshot::{snapshot_id, HostMeta, Snapshot};

/// Assemble one snapshot from the settled probe results.
///
/// Pure: no I/O. Results are keyed by facet so the snapshot's facet order is
/// stable regardless of completion order. If a facet appears twice, the first
/// result wins.
#[must_use]
pub fn build_snapshot(
    created_at: DateTime<Utc>,
    host_meta: HostMeta,
    results: Vec<ProbeResult>,
) -> Snapshot {
    let mut by_facet = BTreeMap::new();
    for result in results {
        if by_facet.contains_key(&result.facet) {
            tracing::warn!("Dropping duplicate {} result", result.facet);
            continue;
        }
        by_facet.insert(result.facet, result);
    }

    Snapshot {
        id: snapshot_id(created_at),
        created_at,
        host_meta,
        results: by_facet,
    }
}
