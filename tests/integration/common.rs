use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use hostdrift::application::services::agent::{AgentService, RunReport};
use hostdrift::application::services::registry::ProbeRegistry;
use hostdrift::domain::alerting::{default_rules, AlertPolicy, AlertTracker, ConditionEngine, DriftRule};
use hostdrift::domain::entities::alert::Dispatch;
use hostdrift::domain::entities::probe_result::Observation;
use hostdrift::domain::entities::snapshot::HostMeta;
use hostdrift::domain::ports::notifier::{NotificationError, Notifier};
use hostdrift::domain::ports::probe::{Probe, ProbeContext, ProbeError};
use hostdrift::domain::ports::store::{DiffStore, LedgerStore, SnapshotStore};
use hostdrift::domain::value_objects::probe_settings::PortSettings;
use hostdrift::domain::value_objects::{Facet, FieldMap, FieldValue, ProbeSettings, ProbeStatus};
use hostdrift::infrastructure::probes::ports::parse_ss_output;
use hostdrift::infrastructure::probes::users::members_from_group_file;

// ---------------------------------------------------------------------------
// Fixture loader
// ---------------------------------------------------------------------------

pub fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).expect("Failed to read fixture")
}

// ---------------------------------------------------------------------------
// Fixture-backed probes
// ---------------------------------------------------------------------------

/// Ports probe fed from captured `ss -tulpnH` output.
pub struct SsFixtureProbe {
    fixture: Mutex<&'static str>,
}

impl SsFixtureProbe {
    pub fn new(fixture: &'static str) -> Arc<Self> {
        Arc::new(Self {
            fixture: Mutex::new(fixture),
        })
    }

    pub fn load(&self, fixture: &'static str) {
        *self.fixture.lock().expect("lock") = fixture;
    }
}

#[async_trait]
impl Probe for SsFixtureProbe {
    fn facet(&self) -> Facet {
        Facet::Ports
    }

    async fn collect(&self, _ctx: &ProbeContext) -> Result<Observation, ProbeError> {
        let name = *self.fixture.lock().expect("lock");
        let mut data = FieldMap::new();
        data.insert(
            "ports".into(),
            parse_ss_output(&load_fixture(name), &PortSettings::default()),
        );
        Ok(Observation::new(ProbeStatus::Ok, "fixture", data))
    }
}

/// Users probe fed from a captured group database.
pub struct GroupFixtureProbe {
    fixture: Mutex<&'static str>,
}

impl GroupFixtureProbe {
    pub fn new(fixture: &'static str) -> Arc<Self> {
        Arc::new(Self {
            fixture: Mutex::new(fixture),
        })
    }

    pub fn load(&self, fixture: &'static str) {
        *self.fixture.lock().expect("lock") = fixture;
    }
}

#[async_trait]
impl Probe for GroupFixtureProbe {
    fn facet(&self) -> Facet {
        Facet::Users
    }

    async fn collect(&self, _ctx: &ProbeContext) -> Result<Observation, ProbeError> {
        let name = *self.fixture.lock().expect("lock");
        let groups = vec!["sudo".to_string(), "wheel".to_string()];
        let members = members_from_group_file(&load_fixture(name), &groups);
        let mut data = FieldMap::new();
        data.insert("sudo_users".into(), FieldValue::name_set(members));
        Ok(Observation::new(ProbeStatus::Ok, "fixture", data))
    }
}

/// Firewall probe whose state and availability can be flipped between runs.
pub struct FirewallSwitch {
    state: Mutex<Result<bool, ProbeError>>,
}

impl FirewallSwitch {
    pub fn new(enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(Ok(enabled)),
        })
    }

    pub fn set(&self, state: Result<bool, ProbeError>) {
        *self.state.lock().expect("lock") = state;
    }
}

#[async_trait]
impl Probe for FirewallSwitch {
    fn facet(&self) -> Facet {
        Facet::Firewall
    }

    async fn collect(&self, _ctx: &ProbeContext) -> Result<Observation, ProbeError> {
        let enabled = self.state.lock().expect("lock").clone()?;
        let mut data = FieldMap::new();
        data.insert("backend".into(), FieldValue::text("ufw"));
        data.insert("enabled".into(), FieldValue::Bool(enabled));
        let (status, details) = if enabled {
            (ProbeStatus::Ok, "ufw active rules=0")
        } else {
            (ProbeStatus::Crit, "ufw inactive rules=0")
        };
        Ok(Observation::new(status, details, data))
    }
}

// ---------------------------------------------------------------------------
// TrackingNotifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct TrackingNotifier {
    dispatches: Mutex<Vec<Dispatch>>,
}

impl TrackingNotifier {
    pub fn take(&self) -> Vec<Dispatch> {
        std::mem::take(&mut *self.dispatches.lock().expect("lock"))
    }
}

impl Notifier for TrackingNotifier {
    fn notify(&self, dispatch: &Dispatch) -> Result<(), NotificationError> {
        self.dispatches.lock().expect("lock").push(dispatch.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub registry: ProbeRegistry,
    pub ctx: ProbeContext,
    pub host: HostMeta,
    pub conditions: ConditionEngine,
    pub tracker: AlertTracker,
    pub notifier: TrackingNotifier,
}

impl Harness {
    pub fn new(probes: Vec<Arc<dyn Probe>>, policy: AlertPolicy) -> Self {
        Self {
            registry: ProbeRegistry::new(probes, 4, Duration::from_secs(10)),
            ctx: ProbeContext::new(false, Duration::from_secs(5), ProbeSettings::default()),
            host: HostMeta {
                hostname: "web-01".into(),
                kernel_version: "6.1.0".into(),
                agent_version: "test".into(),
            },
            conditions: ConditionEngine::new(default_rules(true, false, DriftRule::defaults())),
            tracker: AlertTracker::new(policy),
            notifier: TrackingNotifier::default(),
        }
    }

    pub fn service<'a, S>(&'a self, store: &'a S) -> AgentService<'a>
    where
        S: SnapshotStore + DiffStore + LedgerStore,
    {
        AgentService::new(
            &self.registry,
            &self.ctx,
            &self.host,
            &self.conditions,
            &self.tracker,
            store,
            store,
            store,
            &self.notifier,
        )
    }

    pub async fn run_full<S>(&self, store: &S) -> RunReport
    where
        S: SnapshotStore + DiffStore + LedgerStore,
    {
        self.service(store).run_full().await
    }

    pub async fn run_notify<S>(&self, store: &S, facets: &[Facet]) -> RunReport
    where
        S: SnapshotStore + DiffStore + LedgerStore,
    {
        self.service(store).run_notify(facets).await
    }
}
