pub mod command;
pub mod firewall;
pub mod logs;
pub mod ports;
pub mod ssh;
pub mod updates;
pub mod users;

use std::sync::Arc;

use crate::domain::ports::probe::Probe;
use crate::domain::value_objects::Facet;

use self::firewall::FirewallProbe;
use self::logs::LogsProbe;
use self::ports::PortsProbe;
use self::ssh::SshProbe;
use self::updates::UpdatesProbe;
use self::users::UsersProbe;

#[must_use]
pub fn probe_for(facet: Facet) -> Arc<dyn Probe> {
    match facet {
        Facet::Firewall => Arc::new(FirewallProbe),
        Facet::Logs => Arc::new(LogsProbe),
        Facet::Ports => Arc::new(PortsProbe),
        Facet::Ssh => Arc::new(SshProbe),
        Facet::Updates => Arc::new(UpdatesProbe),
        Facet::Users => Arc::new(UsersProbe),
    }
}

/// One Linux probe per enabled facet, in facet order.
#[must_use]
pub fn default_probes(enabled: &[Facet]) -> Vec<Arc<dyn Probe>> {
    let mut facets = enabled.to_vec();
    facets.sort();
    facets.dedup();
    facets.into_iter().map(probe_for).collect()
}
