// Job registry and check scheduler
// Owns the set of active monitoring jobs, their snapshots, and their timers

use crate::cache::FetchCache;
use crate::conditions::{should_notify, EvaluationContext};
use crate::config::Settings;
use crate::diff::diff_grids;
use crate::dispatch::{Notifier, Platform};
use crate::errors::{FetchError, RegistryError};
use crate::models::{Grid, JobSpec, MonitoringJob, PersistedJob};
use crate::owner::Owner;
use crate::persist::JobStore;
use crate::range::RangeRef;
use crate::source::ValueSource;
use crate::telemetry;
use chrono::{DateTime, Utc};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// JobRegistry owns every active monitoring job and drives its check cycles.
///
/// Each job gets one tokio timer task; cycles for different jobs run
/// concurrently and share the fetch cache. Lock ordering: `jobs` may be held
/// while taking `snapshots`, never the reverse. `timers` is a synchronous
/// mutex and is never held across an await.
pub struct JobRegistry {
    settings: Settings,
    source: Arc<dyn ValueSource>,
    cache: FetchCache,
    notifier: Arc<dyn Notifier>,
    store: JobStore,
    jobs: tokio::sync::RwLock<HashMap<Uuid, MonitoringJob>>,
    snapshots: tokio::sync::Mutex<HashMap<Uuid, Grid>>,
    timers: std::sync::Mutex<HashMap<Uuid, JoinHandle<()>>>,
    // Serializes snapshot collection and file writes so that two concurrent
    // persists cannot land an older snapshot after a newer one.
    persist_lock: tokio::sync::Mutex<()>,
}

impl JobRegistry {
    pub fn new(
        settings: Settings,
        source: Arc<dyn ValueSource>,
        notifier: Arc<dyn Notifier>,
        store: JobStore,
    ) -> Arc<Self> {
        let fetch_timeout = Duration::from_secs(settings.source.fetch_timeout_seconds);
        let cache = FetchCache::new(Arc::clone(&source), &settings.cache, fetch_timeout);

        Arc::new(Self {
            settings,
            source,
            cache,
            notifier,
            store,
            jobs: tokio::sync::RwLock::new(HashMap::new()),
            snapshots: tokio::sync::Mutex::new(HashMap::new()),
            timers: std::sync::Mutex::new(HashMap::new()),
            persist_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<Uuid, JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.source.fetch_timeout_seconds)
    }

    /// Effective check period: the job's frequency, floored by the
    /// configured minimum so a misbehaving client cannot hammer the source
    fn check_period(&self, frequency: Duration) -> Duration {
        frequency.max(Duration::from_secs(
            self.settings.monitor.min_check_interval_seconds,
        ))
    }

    /// Register a new monitoring job for `owner` and start its timer.
    ///
    /// The source is probed once before the job is admitted; a job that can
    /// never fetch is rejected here instead of failing on every cycle.
    #[instrument(skip(self, spec, owner), fields(source_id = %spec.source_id, range = %spec.range))]
    pub async fn create_job(
        self: &Arc<Self>,
        spec: JobSpec,
        owner: Owner,
    ) -> Result<Uuid, RegistryError> {
        self.admit(Uuid::new_v4(), Utc::now(), spec, owner).await
    }

    /// Shared admission path for new jobs and restored records
    async fn admit(
        self: &Arc<Self>,
        id: Uuid,
        created_at: DateTime<Utc>,
        spec: JobSpec,
        owner: Owner,
    ) -> Result<Uuid, RegistryError> {
        if owner.is_anonymous() {
            return Err(RegistryError::MissingField("owner"));
        }
        let range = validate_spec(&spec)?;
        // Canonical spelling of the range, so equivalent spellings share one
        // cache key and compare equal in the duplicate check.
        let range_expr = range.to_string();

        {
            let jobs = self.jobs.read().await;
            if jobs
                .values()
                .any(|job| is_duplicate(job, &spec.source_id, &range_expr, &spec.webhook_url, &owner))
            {
                return Err(RegistryError::DuplicateJob);
            }
        }

        let initial = self
            .source
            .fetch(&spec.source_id, &range_expr, self.fetch_timeout())
            .await?;

        let job = MonitoringJob {
            id,
            source_name: spec
                .source_name
                .clone()
                .unwrap_or_else(|| spec.source_id.clone()),
            source_id: spec.source_id,
            range_expr,
            range,
            frequency: Duration::from_secs(spec.frequency_seconds),
            platform: Platform::from_webhook_url(&spec.webhook_url),
            webhook_url: spec.webhook_url,
            mention: spec.mention,
            conditions: spec.conditions,
            owner,
            created_at,
            last_checked: None,
            active: true,
        };

        {
            let mut jobs = self.jobs.write().await;
            // Re-check under the write lock; another creation may have won
            // the race while the initial fetch was in flight.
            if jobs
                .values()
                .any(|other| is_duplicate(other, &job.source_id, &job.range_expr, &job.webhook_url, &job.owner))
            {
                return Err(RegistryError::DuplicateJob);
            }
            self.snapshots.lock().await.insert(id, initial);
            jobs.insert(id, job.clone());
            telemetry::update_active_jobs(jobs.len());
        }

        self.spawn_timer(&job);
        self.persist_jobs().await;

        info!(
            job_id = %id,
            platform = %job.platform,
            frequency_seconds = job.frequency.as_secs(),
            "Monitoring job created"
        );
        Ok(id)
    }

    /// Stop a job owned by `caller`. Terminal: the job is removed, not
    /// paused, and its timer is aborted before any state is released.
    #[instrument(skip(self, caller), fields(job_id = %id))]
    pub async fn stop_job(&self, id: Uuid, caller: &Owner) -> Result<(), RegistryError> {
        {
            let mut jobs = self.jobs.write().await;
            let job = jobs.get(&id).ok_or(RegistryError::JobNotFound(id))?;
            if !job.owner.matches(caller) {
                return Err(RegistryError::AccessDenied);
            }

            if let Some(handle) = self.timers().remove(&id) {
                handle.abort();
            }
            jobs.remove(&id);
            self.snapshots.lock().await.remove(&id);
            telemetry::update_active_jobs(jobs.len());
        }

        self.persist_jobs().await;
        info!(job_id = %id, "Monitoring job stopped");
        Ok(())
    }

    /// Jobs owned by `caller`, oldest first. Cross-tenant jobs are invisible;
    /// an anonymous caller owns nothing and sees nothing.
    pub async fn list_jobs(&self, caller: &Owner) -> Vec<MonitoringJob> {
        let jobs = self.jobs.read().await;
        let mut owned: Vec<MonitoringJob> = jobs
            .values()
            .filter(|job| job.owner.matches(caller))
            .cloned()
            .collect();
        owned.sort_by_key(|job| job.created_at);
        owned
    }

    /// Run one check cycle for `id` immediately. The cycle still goes
    /// through the fetch cache, so it is subject to the fetch throttle.
    pub async fn force_check(&self, id: Uuid) -> Result<(), RegistryError> {
        if !self.jobs.read().await.contains_key(&id) {
            return Err(RegistryError::JobNotFound(id));
        }
        self.check_job(id).await;
        Ok(())
    }

    /// Replay persisted records through the admission path, preserving their
    /// ids and creation times. Failures are logged and skipped so one bad
    /// record never blocks startup; returns how many jobs came back.
    pub async fn restore(self: &Arc<Self>, records: Vec<PersistedJob>) -> usize {
        let attempts = records.into_iter().map(|record| {
            let registry = Arc::clone(self);
            async move {
                let id = record.id;
                match registry
                    .admit(record.id, record.created_at, record.spec(), record.owner())
                    .await
                {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(job_id = %id, error = %e, "Skipping persisted job that failed to restore");
                        false
                    }
                }
            }
        });

        let results = futures::future::join_all(attempts).await;
        results.into_iter().filter(|restored| *restored).count()
    }

    /// Abort every timer and write a final snapshot of the active set
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut timers = self.timers();
            timers.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &handles {
            handle.abort();
        }

        self.persist_jobs().await;
        info!("Job registry shut down");
    }

    /// Spawn a background task that persists the active set every `period`.
    ///
    /// The task holds only a weak handle, so dropping the registry ends it.
    pub fn spawn_flush_task(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.persist_jobs().await;
            }
        })
    }

    /// Start the per-job timer. The task re-looks the job up by id on every
    /// tick rather than capturing it, so a stopped job is seen as gone on
    /// the next tick even if the abort raced the tick.
    fn spawn_timer(self: &Arc<Self>, job: &MonitoringJob) {
        let id = job.id;
        let period = self.check_period(job.frequency);
        let registry = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                if !registry.jobs.read().await.contains_key(&id) {
                    break;
                }
                registry.check_job(id).await;
            }
        });

        // Never two live timers for one id.
        if let Some(previous) = self.timers().insert(id, handle) {
            previous.abort();
        }
    }

    /// One check cycle: fetch, diff against the stored snapshot, evaluate
    /// conditions, dispatch, then commit the new snapshot.
    #[instrument(skip(self), fields(job_id = %id))]
    async fn check_job(&self, id: Uuid) {
        let job = {
            let jobs = self.jobs.read().await;
            match jobs.get(&id) {
                Some(job) => job.clone(),
                None => return,
            }
        };
        telemetry::record_check_cycle();

        let current = match self.cache.fetch(&job.source_id, &job.range_expr).await {
            Ok(Some(grid)) => grid,
            Ok(None) => {
                debug!("Check skipped by fetch throttle");
                return;
            }
            Err(FetchError::Auth(reason)) => {
                error!(error = %reason, "Source rejected credentials, job left active");
                return;
            }
            Err(e) if !e.is_transient() => {
                error!(error = %e, "Fetch failed and will not recover unattended");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Fetch failed, keeping previous snapshot");
                return;
            }
        };

        let previous = {
            let snapshots = self.snapshots.lock().await;
            snapshots.get(&id).cloned().unwrap_or_default()
        };

        let changes = diff_grids(
            &previous,
            &current,
            &job.range,
            self.settings.monitor.max_reported_changes,
        );
        if !changes.is_empty() {
            telemetry::record_changes_detected(changes.len());
            debug!(change_count = changes.len(), "Changes detected");
        }

        let ctx = EvaluationContext {
            previous: &previous,
            current: &current,
            range: &job.range,
        };
        for change in &changes {
            if !should_notify(&job.conditions, change, &ctx) {
                continue;
            }
            // Dispatch failures never affect job state.
            if let Err(e) = self.notifier.send(&job, change, &job.source_name).await {
                warn!(address = %change.address, error = %e, "Notification dropped");
            }
        }

        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(live) => {
                live.last_checked = Some(Utc::now());
                self.snapshots.lock().await.insert(id, current);
            }
            None => {
                // Stopped while this cycle was running; its result is stale.
                debug!("Job stopped mid-cycle, discarding check result");
            }
        }
    }

    /// Persist the active set. Errors are logged and swallowed; persistence
    /// never affects live jobs.
    async fn persist_jobs(&self) {
        let _guard = self.persist_lock.lock().await;

        let records = {
            let jobs = self.jobs.read().await;
            let mut records: Vec<PersistedJob> = jobs.values().map(PersistedJob::from_job).collect();
            records.sort_by_key(|record| record.created_at);
            records
        };

        if let Err(e) = self.store.save(&records).await {
            warn!(
                error = %e,
                path = %self.store.path().display(),
                "Failed to persist jobs"
            );
        }
    }
}

/// Validate a caller-supplied spec, returning the parsed range
fn validate_spec(spec: &JobSpec) -> Result<RangeRef, RegistryError> {
    if spec.source_id.trim().is_empty() {
        return Err(RegistryError::MissingField("source_id"));
    }
    if spec.webhook_url.trim().is_empty() {
        return Err(RegistryError::MissingField("webhook_url"));
    }

    let url = Url::parse(&spec.webhook_url).map_err(|e| RegistryError::InvalidField {
        field: "webhook_url",
        reason: e.to_string(),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(RegistryError::InvalidField {
            field: "webhook_url",
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if spec.frequency_seconds == 0 {
        return Err(RegistryError::InvalidField {
            field: "frequency_seconds",
            reason: "must be at least 1 second".to_string(),
        });
    }

    let range = RangeRef::parse(&spec.range)?;
    for condition in &spec.conditions {
        if let Some(cell_ref) = &condition.cell_ref {
            RangeRef::parse(cell_ref)?;
        }
    }

    Ok(range)
}

/// Whether `existing` already covers the same watch for the same owner
fn is_duplicate(
    existing: &MonitoringJob,
    source_id: &str,
    range_expr: &str,
    webhook_url: &str,
    owner: &Owner,
) -> bool {
    existing.active
        && existing.source_id == source_id
        && existing.range_expr == range_expr
        && existing.webhook_url == webhook_url
        && existing.owner.matches(owner)
}
