use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{StreamExt, future, stream};
use tokio::sync::{Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::GcConfig;
use crate::labels::managed_children_selector;

use super::cache::WorkflowCache;
use super::dedup::DedupTracker;
use super::deleter::BulkDeleter;
use super::error::GcError;
use super::resolver::AuthoritativeResolver;
use super::store::{JobStore, WorkflowStore};
use super::types::{
    DeleteOutcome, ParentKey, ParentOutcome, Resolution, ResolutionState,
    SweepReport,
};

/// Report of the most recent completed pass, shared with the HTTP layer.
pub type LastReport = Arc<RwLock<Option<SweepReport>>>;

pub struct GarbageCollector {
    jobs: Arc<dyn JobStore>,
    cache: Arc<dyn WorkflowCache>,
    resolver: AuthoritativeResolver,
    deleter: BulkDeleter,
    namespace: Option<String>,
    max_concurrency: usize,
    interval: Duration,
    pass_guard: Mutex<()>,
    last_report: LastReport,
}

impl GarbageCollector {
    pub fn new(
        cfg: &GcConfig,
        jobs: Arc<dyn JobStore>,
        workflows: Arc<dyn WorkflowStore>,
        cache: Arc<dyn WorkflowCache>,
    ) -> Self {
        Self {
            deleter: BulkDeleter::new(jobs.clone(), cfg.propagation()),
            resolver: AuthoritativeResolver::new(workflows),
            jobs,
            cache,
            namespace: cfg.namespace.clone(),
            max_concurrency: cfg.max_concurrency.max(1),
            interval: cfg.interval(),
            pass_guard: Mutex::new(()),
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    pub fn last_report(&self) -> LastReport {
        self.last_report.clone()
    }

    pub fn cache(&self) -> Arc<dyn WorkflowCache> {
        self.cache.clone()
    }

    /// Sweep on every tick until `token` is cancelled. A pass that already
    /// started is allowed to finish.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval = ?self.interval, namespace = ?self.namespace, "garbage collector started");
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("garbage collector stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let _ = self.sweep().await;
                }
            }
        }
    }

    /// Run one pass unless another one is in flight, in which case `None`.
    pub async fn sweep(&self) -> Option<Result<SweepReport, GcError>> {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            debug!("previous pass still running; skipping tick");
            return None;
        };
        let res = self.run_pass().await;
        match &res {
            Ok(report) => {
                if report.deletes_issued > 0 || report.delete_failures > 0 {
                    info!(
                        children = report.children_seen,
                        parents = report.parents.len(),
                        deletes = report.deletes_issued,
                        failures = report.delete_failures,
                        "garbage collector pass done"
                    );
                } else {
                    debug!(
                        children = report.children_seen,
                        parents = report.parents.len(),
                        "garbage collector pass done"
                    );
                }
                *self.last_report.write().await = Some(report.clone());
            }
            Err(e) => error!(error = %e, "garbage collector pass aborted"),
        }
        Some(res)
    }

    /// One full pass: list, group by parent, resolve each parent once and
    /// delete the Jobs of the ones that are gone.
    #[instrument(level = "debug", skip_all)]
    pub async fn run_pass(&self) -> Result<SweepReport, GcError> {
        let started_at = Utc::now().to_rfc3339();
        debug!("collecting garbage jobs");
        let children = self
            .jobs
            .list(self.namespace.as_deref(), &managed_children_selector())
            .await
            .map_err(GcError::List)?;

        let mut report = SweepReport {
            started_at,
            children_seen: children.len(),
            ..Default::default()
        };

        let mut groups: BTreeMap<ParentKey, Vec<String>> = BTreeMap::new();
        for child in children {
            match child.parent_key() {
                Some(key) => {
                    trace!(workflow = %key, job = %child.name, "found job");
                    groups.entry(key).or_default().push(child.name);
                }
                None => {
                    warn!(
                        ns = child.namespace.as_deref().unwrap_or(""),
                        job = %child.name,
                        "unable to find workflow name for job; skipping"
                    );
                    report.malformed_children.push(format!(
                        "{}/{}",
                        child.namespace.unwrap_or_default(),
                        child.name
                    ));
                }
            }
        }

        let tracker = DedupTracker::new();
        let tracker = &tracker;
        let mut parents: Vec<ParentOutcome> = stream::iter(groups)
            .map(|(key, jobs)| self.handle_parent(tracker, key, jobs))
            .buffer_unordered(self.max_concurrency)
            .filter_map(future::ready)
            .collect()
            .await;
        parents.sort_by(|a, b| a.key.cmp(&b.key));

        report.authoritative_lookups = parents
            .iter()
            .filter(|p| {
                matches!(
                    p.state,
                    ResolutionState::AuthoritativeConfirmedPresent
                        | ResolutionState::AuthoritativeConfirmedAbsent
                        | ResolutionState::AuthoritativeError
                )
            })
            .count();
        report.deletes_issued = parents
            .iter()
            .filter(|p| p.delete != DeleteOutcome::NotAttempted)
            .count();
        report.delete_failures = parents
            .iter()
            .filter(|p| p.delete == DeleteOutcome::Failed)
            .count();
        report.parents = parents;
        report.finished_at = Utc::now().to_rfc3339();
        Ok(report)
    }

    async fn handle_parent(
        &self,
        tracker: &DedupTracker,
        key: ParentKey,
        children: Vec<String>,
    ) -> Option<ParentOutcome> {
        if !tracker.claim(&key) {
            trace!(workflow = %key, "already handled in this pass");
            return None;
        }
        let mut outcome = ParentOutcome {
            key,
            children,
            state: ResolutionState::Unresolved,
            delete: DeleteOutcome::NotAttempted,
            error: None,
        };

        outcome.state = self.cached_state(&outcome.key);
        if outcome.state != ResolutionState::CacheConfirmedPresent {
            outcome.state = match self.resolver.resolve(&outcome.key).await {
                Ok(true) => ResolutionState::AuthoritativeConfirmedPresent,
                Ok(false) => ResolutionState::AuthoritativeConfirmedAbsent,
                Err(e) => {
                    warn!(error = %e, "deferring workflow to next pass");
                    outcome.error = Some(e.to_string());
                    ResolutionState::AuthoritativeError
                }
            };
        }
        debug!(workflow = %outcome.key, state = ?outcome.state, "workflow resolved");

        if outcome.state.licenses_delete() {
            match self.deleter.delete_all_of(&outcome.key).await {
                Ok(()) => {
                    outcome.delete = DeleteOutcome::Deleted;
                    for job in &outcome.children {
                        info!(
                            ns = %outcome.key.namespace,
                            job = %job,
                            workflow = %outcome.key.name,
                            "job collected by garbage collector"
                        );
                    }
                }
                Err(e) => {
                    error!(error = %e, "garbage collector delete failed");
                    outcome.delete = DeleteOutcome::Failed;
                    outcome.error = Some(e.to_string());
                }
            }
        }
        Some(outcome)
    }

    fn cached_state(&self, key: &ParentKey) -> ResolutionState {
        match self.cache.lookup(&key.namespace, &key.name) {
            Resolution::Present => ResolutionState::CacheConfirmedPresent,
            Resolution::Absent => {
                trace!(workflow = %key, "cache miss; confirming with API server");
                ResolutionState::CacheConfirmedAbsent
            }
            Resolution::Inconclusive => {
                trace!(workflow = %key, "cache inconclusive; asking API server");
                ResolutionState::CacheInconclusive
            }
        }
    }
}
