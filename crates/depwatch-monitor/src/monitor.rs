//! Status monitor — background driver for periodic sweeps.
//!
//! On start it seeds definitions and runs one warm sweep so the cache is
//! populated before dashboards read it. After that it sweeps stale checks
//! on a fixed tick until the shutdown signal fires. Nothing that goes wrong
//! inside one iteration stops the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use depwatch_state::{DefinitionSeed, DefinitionStore};

use crate::orchestrator::{SweepOrchestrator, SweepOutcome};

/// Default delay between background sweeps.
pub const DEFAULT_TICK: Duration = Duration::from_secs(30);

/// Drives the orchestrator from a timer.
pub struct StatusMonitor {
    orchestrator: Arc<SweepOrchestrator>,
    definitions: Arc<dyn DefinitionStore>,
    seeds: Vec<DefinitionSeed>,
    tick: Duration,
}

impl StatusMonitor {
    pub fn new(
        orchestrator: Arc<SweepOrchestrator>,
        definitions: Arc<dyn DefinitionStore>,
        seeds: Vec<DefinitionSeed>,
    ) -> Self {
        Self {
            orchestrator,
            definitions,
            seeds,
            tick: DEFAULT_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Seed definitions and warm the cache. Failures are logged only.
    pub async fn startup(&self) {
        match self.definitions.ensure_seeded(&self.seeds) {
            Ok(inserted) => debug!(inserted, seeds = self.seeds.len(), "seeding finished"),
            Err(e) => error!(error = %e, "failed to seed check definitions"),
        }

        match self.orchestrator.refresh_stale_checks(false).await {
            Ok(SweepOutcome::Completed(report)) => {
                info!(rows = report.snapshot_rows, "snapshot cache warmed")
            }
            Ok(SweepOutcome::AlreadyRunning) => debug!("warm sweep skipped; sweep in progress"),
            Err(e) => {
                error!(error = %e, "warm sweep failed");
                // Fall back to whatever history the store already has.
                if let Err(e) = self.orchestrator.warm_cache().await {
                    error!(error = %e, "failed to warm cache from store; starting cold");
                }
            }
        }
    }

    /// Run one timer-driven sweep.
    pub async fn tick_once(&self) {
        match self.orchestrator.refresh_stale_checks(false).await {
            Ok(SweepOutcome::Completed(report)) => {
                debug!(checked = report.checked, "tick sweep done")
            }
            Ok(SweepOutcome::AlreadyRunning) => warn!("sweep still in progress; tick skipped"),
            Err(e) => error!(error = %e, "tick sweep failed"),
        }
    }

    /// Start up, then sweep on every tick until `shutdown` fires.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        tokio::select! {
            _ = self.startup() => {}
            _ = shutdown.changed() => {
                info!("status monitor stopped during startup");
                return;
            }
        }

        self.run_ticks(shutdown).await;
    }

    /// Sweep on every tick until `shutdown` fires. Expects [`startup`] to
    /// have run already.
    ///
    /// Both the tick wait and the wait on an in-flight sweep are abandoned as
    /// soon as the shutdown signal arrives; the sweep itself finishes in the
    /// background, bounded by its probes' timeouts.
    ///
    /// [`startup`]: StatusMonitor::startup
    pub async fn run_ticks(self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_secs = self.tick.as_secs(), "status monitor started");

        if *shutdown.borrow() {
            return;
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {}
                _ = shutdown.changed() => break,
            }
            tokio::select! {
                _ = self.tick_once() => {}
                _ = shutdown.changed() => {
                    info!("stopped waiting on in-flight sweep for shutdown");
                    break;
                }
            }
        }

        info!("status monitor shutting down");
    }
}
