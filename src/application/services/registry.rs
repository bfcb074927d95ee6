use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::domain::entities::probe_result::ProbeResult;
use crate::domain::ports::probe::{Probe, ProbeContext, ProbeError};
use crate::domain::value_objects::Facet;

/// Holds the enabled probes and runs them with bounded concurrency.
///
/// Each probe runs under the context's timeout; the run as a whole is bounded
/// by `run_deadline`, after which pending probes are cancelled (dropping any
/// child process they spawned) and recorded as `unknown`.
#[derive(Clone)]
pub struct ProbeRegistry {
    probes: Vec<Arc<dyn Probe>>,
    max_concurrency: usize,
    run_deadline: Duration,
}

impl ProbeRegistry {
    #[must_use]
    pub fn new(probes: Vec<Arc<dyn Probe>>, max_concurrency: usize, run_deadline: Duration) -> Self {
        Self {
            probes,
            max_concurrency: max_concurrency.max(1),
            run_deadline,
        }
    }

    #[must_use]
    pub fn facets(&self) -> Vec<Facet> {
        let mut facets: Vec<Facet> = self.probes.iter().map(|p| p.facet()).collect();
        facets.sort();
        facets.dedup();
        facets
    }

    /// Registry limited to the probes of `facets`.
    #[must_use]
    pub fn restricted_to(&self, facets: &[Facet]) -> Self {
        Self {
            probes: self
                .probes
                .iter()
                .filter(|p| facets.contains(&p.facet()))
                .cloned()
                .collect(),
            max_concurrency: self.max_concurrency,
            run_deadline: self.run_deadline,
        }
    }

    /// Runs every probe and returns one result per facet, failed ones
    /// included, ordered by facet.
    pub async fn run_all(&self, ctx: &ProbeContext) -> Vec<ProbeResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for probe in &self.probes {
            let probe = Arc::clone(probe);
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let facet = probe.facet();
                tracing::debug!("Running probe {facet}");
                if let Ok(result) = tokio::time::timeout(ctx.timeout, probe.run(&ctx)).await {
                    result
                } else {
                    let e = ProbeError::Timeout(ctx.timeout);
                    tracing::warn!("Probe {facet} cancelled: {e}");
                    ProbeResult::failed(facet, &e, Utc::now())
                }
            });
        }

        let mut results: BTreeMap<Facet, ProbeResult> = BTreeMap::new();
        let mut deadline_hit = false;
        let deadline = tokio::time::sleep(self.run_deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(result)) => {
                        if results.contains_key(&result.facet) {
                            tracing::warn!("Duplicate result for {}, keeping the first", result.facet);
                        } else {
                            results.insert(result.facet, result);
                        }
                    }
                    Some(Err(e)) => tracing::warn!("Probe task ended abnormally: {e}"),
                    None => break,
                },
                () = &mut deadline => {
                    tracing::warn!(
                        "Run deadline of {}s reached, cancelling {} probe(s)",
                        self.run_deadline.as_secs(),
                        tasks.len()
                    );
                    deadline_hit = true;
                    tasks.shutdown().await;
                    break;
                }
            }
        }

        for facet in self.facets() {
            results.entry(facet).or_insert_with(|| {
                let e = if deadline_hit {
                    ProbeError::DeadlineExceeded
                } else {
                    ProbeError::Aborted("probe task did not complete".into())
                };
                ProbeResult::failed(facet, &e, Utc::now())
            });
        }

        results.into_values().collect()
    }
}
