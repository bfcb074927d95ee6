pub mod facet;
pub mod field_value;
pub mod probe_settings;
pub mod probe_status;
pub mod severity;

pub use facet::Facet;
pub use field_value::{FieldMap, FieldValue};
pub use probe_settings::ProbeSettings;
pub use probe_status::ProbeStatus;
pub use severity::Severity;
