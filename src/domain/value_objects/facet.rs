use serde::{Deserialize, Serialize};

/// One category of security-relevant host state.
///
/// Variants are declared in lexicographic order of their names so the derived
/// `Ord` matches the stable facet ordering used by snapshots and diffs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Firewall,
    Logs,
    Ports,
    Ssh,
    Updates,
    Users,
}

impl Facet {
    pub const ALL: [Self; 6] = [
        Self::Firewall,
        Self::Logs,
        Self::Ports,
        Self::Ssh,
        Self::Updates,
        Self::Users,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Firewall => "firewall",
            Self::Logs => "logs",
            Self::Ports => "ports",
            Self::Ssh => "ssh",
            Self::Updates => "updates",
            Self::Users => "users",
        }
    }
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Facet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|facet| facet.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown facet '{s}'"))
    }
}
