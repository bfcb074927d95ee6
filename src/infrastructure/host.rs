use sysinfo::System;

use crate::domain::entities::snapshot::HostMeta;

/// Identity of the machine the agent runs on.
#[must_use]
pub fn host_meta() -> HostMeta {
    HostMeta {
        hostname: System::host_name().unwrap_or_else(|| "unknown".into()),
        kernel_version: System::kernel_version().unwrap_or_else(|| "unknown".into()),
        agent_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Whether the process runs with an effective uid of 0.
#[must_use]
pub fn is_privileged() -> bool {
    nix::unistd::geteuid().is_root()
}
