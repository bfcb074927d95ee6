use serde::{Deserialize, Serialize};

use super::severity::Severity;

/// Outcome status reported by a probe for its facet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Ok,
    Warn,
    Crit,
    /// The probe could not collect data; the result carries an error.
    #[default]
    Unknown,
}

impl ProbeStatus {
    /// Severity this status maps to when treated as an alert condition.
    /// `Unknown` only maps when `alert_on_unknown` is set.
    #[must_use]
    pub const fn severity(&self, alert_on_unknown: bool) -> Option<Severity> {
        match self {
            Self::Ok => None,
            Self::Warn => Some(Severity::Warning),
            Self::Crit => Some(Severity::Critical),
            Self::Unknown => {
                if alert_on_unknown {
                    Some(Severity::Warning)
                } else {
                    None
                }
            }
        }
    }

    /// Returns the more severe of two statuses (`Unknown` ranks below `Warn`).
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        if self.rank() >= other.rank() {
            self
        } else {
            other
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Unknown => 1,
            Self::Warn => 2,
            Self::Crit => 3,
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Warn => write!(f, "warn"),
            Self::Crit => write!(f, "crit"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
