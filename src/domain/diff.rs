//! Structural comparison of snapshots.
//!
//! Pure and deterministic: the same two snapshots always produce the same
//! ordered entries. Facets are visited in their stable order, entries inside
//! a facet are sorted by path. Severity is never consulted here.

use std::collections::BTreeSet;

use crate::domain::entities::diff::{ChangeKind, Diff, DiffEntry};
use crate::domain::entities::probe_result::ProbeResult;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::value_objects::{Facet, FieldMap, FieldValue};

/// Diff recorded when there is no previous snapshot: the new snapshot
/// becomes the baseline and nothing counts as drift.
#[must_use]
pub fn baseline_diff(to: &Snapshot) -> Diff {
    Diff {
        from_snapshot_id: None,
        to_snapshot_id: to.id.clone(),
        created_at: to.created_at,
        entries: Vec::new(),
    }
}

/// Compares two snapshots facet by facet.
#[must_use]
pub fn diff_snapshots(from: &Snapshot, to: &Snapshot) -> Diff {
    let facets: BTreeSet<Facet> = from.facets().chain(to.facets()).collect();
    let mut entries = Vec::new();

    for facet in facets {
        match (from.result(facet), to.result(facet)) {
            (Some(old), Some(new)) => entries.extend(diff_results(old, new)),
            (None, Some(new)) => entries.push(DiffEntry {
                facet,
                kind: ChangeKind::Added,
                path: facet.as_str().to_string(),
                old_value: None,
                new_value: Some(summarize(new)),
            }),
            (Some(old), None) => entries.push(DiffEntry {
                facet,
                kind: ChangeKind::Removed,
                path: facet.as_str().to_string(),
                old_value: Some(summarize(old)),
                new_value: None,
            }),
            (None, None) => {}
        }
    }

    Diff {
        from_snapshot_id: Some(from.id.clone()),
        to_snapshot_id: to.id.clone(),
        created_at: to.created_at,
        entries,
    }
}

/// Compares two results of the same facet.
///
/// A schema mismatch, or a failed probe on either side, collapses into a
/// single `changed` entry at the facet root instead of a per-field cascade.
#[must_use]
pub fn diff_results(old: &ProbeResult, new: &ProbeResult) -> Vec<DiffEntry> {
    let facet = new.facet;

    if old.schema != new.schema || old.is_failed() || new.is_failed() {
        let (old_summary, new_summary) = (summarize(old), summarize(new));
        if old_summary == new_summary {
            return Vec::new();
        }
        return vec![DiffEntry {
            facet,
            kind: ChangeKind::Changed,
            path: facet.as_str().to_string(),
            old_value: Some(old_summary),
            new_value: Some(new_summary),
        }];
    }

    let mut entries = Vec::new();
    if old.data != new.data {
        compare_maps(facet, "", &old.data, &new.data, &mut entries);
        entries.sort_by(|a, b| a.path.cmp(&b.path));
    }
    entries
}

/// Whole-result value used for facet-level entries. Excludes the collection
/// time so identical state always summarizes identically.
fn summarize(result: &ProbeResult) -> FieldValue {
    let mut summary = FieldMap::new();
    summary.insert("status".into(), FieldValue::text(result.status.to_string()));
    summary.insert("details".into(), FieldValue::text(result.details.clone()));
    summary.insert("data".into(), FieldValue::Map(result.data.clone()));
    summary.insert("schema".into(), FieldValue::Int(i64::from(result.schema)));
    if let Some(ref error) = result.error {
        summary.insert("error".into(), FieldValue::text(error.clone()));
    }
    FieldValue::Map(summary)
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn compare_maps(
    facet: Facet,
    prefix: &str,
    old: &FieldMap,
    new: &FieldMap,
    out: &mut Vec<DiffEntry>,
) {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    for key in keys {
        let path = join(prefix, key);
        compare_slot(facet, path, old.get(key), new.get(key), out);
    }
}

fn compare_sets(
    facet: Facet,
    path: &str,
    old: &FieldMap,
    new: &FieldMap,
    out: &mut Vec<DiffEntry>,
) {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    for key in keys {
        let member_path = format!("{path}[{key}]");
        compare_slot(facet, member_path, old.get(key), new.get(key), out);
    }
}

fn compare_slot(
    facet: Facet,
    path: String,
    old: Option<&FieldValue>,
    new: Option<&FieldValue>,
    out: &mut Vec<DiffEntry>,
) {
    match (old, new) {
        (None, Some(value)) => out.push(DiffEntry {
            facet,
            kind: ChangeKind::Added,
            path,
            old_value: None,
            new_value: Some(value.clone()),
        }),
        (Some(value), None) => out.push(DiffEntry {
            facet,
            kind: ChangeKind::Removed,
            path,
            old_value: Some(value.clone()),
            new_value: None,
        }),
        (Some(a), Some(b)) if a != b => compare_values(facet, path, a, b, out),
        _ => {}
    }
}

fn compare_values(
    facet: Facet,
    path: String,
    old: &FieldValue,
    new: &FieldValue,
    out: &mut Vec<DiffEntry>,
) {
    match (old, new) {
        (FieldValue::Map(a), FieldValue::Map(b)) => compare_maps(facet, &path, a, b, out),
        (FieldValue::Set(a), FieldValue::Set(b)) => compare_sets(facet, &path, a, b, out),
        _ => out.push(DiffEntry {
            facet,
            kind: ChangeKind::Changed,
            path,
            old_value: Some(old.clone()),
            new_value: Some(new.clone()),
        }),
    }
}
