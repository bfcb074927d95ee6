use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Facet, FieldValue};

/// Kind of structural change between two snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

impl ChangeKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change inside a facet, located by `path` within the facet's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub facet: Facet,
    pub kind: ChangeKind,
    pub path: String,
    pub old_value: Option<FieldValue>,
    pub new_value: Option<FieldValue>,
}

/// Ordered set of changes between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    /// `None` when there was no previous snapshot to compare against.
    pub from_snapshot_id: Option<String>,
    pub to_snapshot_id: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<DiffEntry>,
}

impl Diff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_for(&self, facet: Facet) -> impl Iterator<Item = &DiffEntry> {
        self.entries.iter().filter(move |e| e.facet == facet)
    }
}
