//! Consumer-facing surface: snapshot reads and rate-limited manual refresh.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use depwatch_state::{DefinitionStore, DefinitionUpdate};

use crate::cache::{CacheSnapshot, SnapshotCache};
use crate::error::MonitorResult;
use crate::limiter::RefreshLimiter;
use crate::orchestrator::{SweepOrchestrator, SweepOutcome, SweepReport};

/// Result of a manual refresh request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The caller refreshed too recently; nothing was started.
    RateLimited { retry_after_seconds: u64 },
    /// Another sweep was in flight; this request collapsed into it.
    AlreadyRunning,
    Completed(SweepReport),
}

/// What presentation layers call into.
pub struct StatusService {
    cache: Arc<SnapshotCache>,
    definitions: Arc<dyn DefinitionStore>,
    orchestrator: Arc<SweepOrchestrator>,
    limiter: Arc<RefreshLimiter>,
}

impl StatusService {
    pub fn new(
        cache: Arc<SnapshotCache>,
        definitions: Arc<dyn DefinitionStore>,
        orchestrator: Arc<SweepOrchestrator>,
        limiter: Arc<RefreshLimiter>,
    ) -> Self {
        Self {
            cache,
            definitions,
            orchestrator,
            limiter,
        }
    }

    /// Latest status for every enabled check.
    ///
    /// Served from the cache; only a never-warmed cache falls through to the
    /// store. The fallback result is not cached.
    pub async fn get_snapshot(&self) -> MonitorResult<Arc<CacheSnapshot>> {
        if let Some(snapshot) = self.cache.get_snapshot().await {
            return Ok(snapshot);
        }
        debug!("snapshot cache cold; reading latest rows from store");
        let rows = self.definitions.list_latest(false)?;
        Ok(Arc::new(CacheSnapshot::new(rows)))
    }

    /// Manually trigger a forced sweep on behalf of `caller_key`.
    pub async fn trigger_refresh(&self, caller_key: &str) -> MonitorResult<RefreshOutcome> {
        let decision = self.limiter.try_acquire(caller_key, Utc::now());
        if !decision.allowed {
            warn!(
                caller = %caller_key,
                retry_after = decision.retry_after_seconds,
                "manual refresh denied"
            );
            return Ok(RefreshOutcome::RateLimited {
                retry_after_seconds: decision.retry_after_seconds,
            });
        }

        info!(caller = %caller_key, "manual refresh requested");
        Ok(match self.orchestrator.refresh_stale_checks(true).await? {
            SweepOutcome::Completed(report) => RefreshOutcome::Completed(report),
            SweepOutcome::AlreadyRunning => RefreshOutcome::AlreadyRunning,
        })
    }

    /// Apply a batch of tunable edits, then republish the snapshot so
    /// readers see the new settings before the next sweep.
    pub async fn update_definitions(&self, updates: &[DefinitionUpdate]) -> MonitorResult<usize> {
        let updated = self.definitions.update_definitions(updates)?;
        if let Err(e) = self.orchestrator.warm_cache().await {
            warn!(error = %e, "failed to republish snapshot after definition update");
        }
        Ok(updated)
    }

    pub fn definitions(&self) -> &Arc<dyn DefinitionStore> {
        &self.definitions
    }
}
