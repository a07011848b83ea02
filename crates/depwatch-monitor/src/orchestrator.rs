//! Single-flight sweep orchestration.
//!
//! A sweep loads enabled definitions, keeps the stale ones (or all of them
//! when forced), runs their probes with bounded parallelism, persists each
//! result and finally replaces the snapshot cache. At most one sweep runs
//! at a time; a trigger that arrives while one is in flight returns
//! immediately with [`SweepOutcome::AlreadyRunning`] instead of queueing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use depwatch_core::limits;
use depwatch_state::{CheckDefinition, DefinitionStore, LatestRow, ResultStore};

use crate::cache::{CacheSnapshot, SnapshotCache};
use crate::error::{MonitorError, MonitorResult};
use crate::probe::{Probe, ProbeRegistry};
use crate::runner::run_check;
use crate::schedule::is_stale;

/// Non-queueing gate with capacity one.
#[derive(Debug, Default)]
pub struct SweepGate {
    running: AtomicBool,
}

/// Proof of holding the gate; releases it on drop.
#[derive(Debug)]
pub struct SweepPermit {
    gate: Arc<SweepGate>,
}

impl SweepGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enter the gate without waiting. `None` if a sweep already holds it.
    pub fn try_enter(self: &Arc<Self>) -> Option<SweepPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepPermit { gate: self.clone() })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for SweepPermit {
    fn drop(&mut self) {
        self.gate.running.store(false, Ordering::Release);
    }
}

/// Counters describing one finished sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Enabled definitions considered.
    pub considered: usize,
    /// Definitions probed and persisted.
    pub checked: usize,
    /// Definitions skipped because their last result is still fresh.
    pub fresh: usize,
    /// Definitions with no registered probe.
    pub unprobed: usize,
    /// Results that could not be persisted.
    pub failed: usize,
    /// Rows in the snapshot published at the end of the sweep.
    pub snapshot_rows: usize,
}

/// What happened to a sweep request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SweepOutcome {
    Completed(SweepReport),
    AlreadyRunning,
}

/// Owns the lifecycle of a sweep. Clones share the same gate.
#[derive(Clone)]
pub struct SweepOrchestrator {
    definitions: Arc<dyn DefinitionStore>,
    results: Arc<dyn ResultStore>,
    probes: Arc<ProbeRegistry>,
    cache: Arc<SnapshotCache>,
    gate: Arc<SweepGate>,
    max_parallel: usize,
}

impl SweepOrchestrator {
    pub fn new(
        definitions: Arc<dyn DefinitionStore>,
        results: Arc<dyn ResultStore>,
        probes: Arc<ProbeRegistry>,
        cache: Arc<SnapshotCache>,
    ) -> Self {
        Self {
            definitions,
            results,
            probes,
            cache,
            gate: SweepGate::new(),
            max_parallel: 4,
        }
    }

    /// Cap on probes running at once inside a sweep (minimum one).
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    /// Run a sweep unless one is already in flight.
    ///
    /// With `force_all` every enabled definition is probed regardless of
    /// staleness. Disabled definitions are never probed.
    ///
    /// The sweep runs on its own task which holds the gate until every probe
    /// has finished and been persisted. Dropping this future stops the wait,
    /// not the sweep.
    pub async fn refresh_stale_checks(&self, force_all: bool) -> MonitorResult<SweepOutcome> {
        let Some(permit) = self.gate.try_enter() else {
            info!(force_all, "sweep already running; request ignored");
            return Ok(SweepOutcome::AlreadyRunning);
        };

        let this = self.clone();
        let sweep = tokio::spawn(async move {
            let _permit = permit;
            this.sweep(force_all).await
        });
        match sweep.await {
            Ok(report) => Ok(SweepOutcome::Completed(report?)),
            Err(e) => Err(MonitorError::SweepAborted(e.to_string())),
        }
    }

    /// Rebuild the snapshot from the store without probing anything.
    pub async fn warm_cache(&self) -> MonitorResult<usize> {
        let rows = self.definitions.list_latest(false)?;
        let count = rows.len();
        self.cache.set_snapshot(CacheSnapshot::new(rows)).await;
        Ok(count)
    }

    async fn sweep(&self, force_all: bool) -> MonitorResult<SweepReport> {
        let now = Utc::now();
        let rows = self.definitions.list_latest(false)?;
        let mut report = SweepReport {
            considered: rows.len(),
            ..Default::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();

        for row in rows {
            let interval = row.definition.interval_seconds;
            if !force_all && !is_stale(row.last_checked_utc(), interval, now) {
                report.fresh += 1;
                continue;
            }
            let LatestRow { definition, .. } = row;
            let Some(probe) = self.probes.get(&definition.key) else {
                warn!(key = %definition.key, "no probe registered for definition; skipping");
                report.unprobed += 1;
                continue;
            };

            let semaphore = semaphore.clone();
            let results = self.results.clone();
            tasks.spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _slot = semaphore.acquire_owned().await.ok();
                check_and_store(definition, probe, results).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => report.checked += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    error!(error = %e, "check task aborted");
                    report.failed += 1;
                }
            }
        }

        let rows = self.definitions.list_latest(false)?;
        report.snapshot_rows = rows.len();
        self.cache.set_snapshot(CacheSnapshot::new(rows)).await;

        info!(
            force_all,
            considered = report.considered,
            checked = report.checked,
            fresh = report.fresh,
            unprobed = report.unprobed,
            failed = report.failed,
            "sweep completed"
        );
        Ok(report)
    }
}

/// Probe one definition and persist its result. Returns whether the write
/// succeeded; storage errors are logged so the rest of the sweep continues.
async fn check_and_store(
    definition: CheckDefinition,
    probe: Arc<dyn Probe>,
    results: Arc<dyn ResultStore>,
) -> bool {
    let checked_utc: DateTime<Utc> = Utc::now();
    let timeout_secs = limits::clamp_timeout(definition.timeout_seconds);
    let timeout = Duration::from_secs(u64::from(timeout_secs));
    let outcome = run_check(
        &definition.key,
        probe,
        timeout,
        definition.degraded_threshold_ms,
    )
    .await;

    match results.insert_result(definition.id, checked_utc, &outcome) {
        Ok(stored) => {
            debug!(
                key = %definition.key,
                result_id = stored.id,
                status = stored.outcome.status.as_str(),
                "check recorded"
            );
            true
        }
        Err(e) => {
            error!(key = %definition.key, error = %e, "failed to persist check result");
            false
        }
    }
}
