//! Daemon wiring: config → store → probes → monitor + API.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};

use depwatch_core::DepwatchConfig;
use depwatch_monitor::{
    HttpProbe, ProbeRegistry, RefreshLimiter, SnapshotCache, StatusMonitor, StatusService,
    SweepOrchestrator,
};
use depwatch_state::{DefinitionSeed, StateStore};

/// Seed rows for every configured check.
pub fn seeds_from_config(config: &DepwatchConfig) -> Vec<DefinitionSeed> {
    config
        .checks
        .iter()
        .map(|check| DefinitionSeed {
            key: check.key.clone(),
            display_name: check.display_name.clone(),
            category: check.category.clone(),
            is_enabled: check.enabled,
            interval_seconds: check.interval_seconds,
            timeout_seconds: check.timeout_seconds,
            degraded_threshold_ms: check.degraded_threshold_ms,
        })
        .collect()
}

/// One HTTP probe per configured check, keyed by check key.
pub fn build_probes(config: &DepwatchConfig) -> anyhow::Result<ProbeRegistry> {
    let mut registry = ProbeRegistry::new();
    for check in &config.checks {
        let probe = HttpProbe::new(&check.url)
            .with_context(|| format!("check '{}' has an unusable url", check.key))?;
        registry.register(check.key.clone(), Arc::new(probe));
    }
    Ok(registry)
}

/// Subsystems wired from config. Built by [`assemble`].
pub struct Daemon {
    pub store: StateStore,
    pub service: Arc<StatusService>,
    pub monitor: StatusMonitor,
}

/// Open the store, build probes and services, then seed and warm the cache.
///
/// Returns only after startup has finished, so anything served from the
/// returned service sees seeded definitions and a warm snapshot.
pub async fn assemble(config: &DepwatchConfig, db_path: &Path) -> anyhow::Result<Daemon> {
    let store = StateStore::open(db_path)?;
    info!(path = ?db_path, "state store opened");

    let probes = build_probes(config)?;
    if probes.is_empty() {
        warn!("no checks configured; nothing will be probed");
    }
    info!(probes = ?probes, "probes registered");

    let cache = Arc::new(SnapshotCache::new());
    let orchestrator = Arc::new(
        SweepOrchestrator::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(probes),
            cache.clone(),
        )
        .with_max_parallel(config.monitor.max_parallel_probes),
    );

    let limiter = Arc::new(RefreshLimiter::new(Duration::from_secs(
        config.monitor.refresh_cooldown_seconds,
    )));
    let service = Arc::new(StatusService::new(
        cache,
        Arc::new(store.clone()),
        orchestrator.clone(),
        limiter,
    ));

    let monitor = StatusMonitor::new(
        orchestrator,
        Arc::new(store.clone()),
        seeds_from_config(config),
    )
    .with_tick(Duration::from_secs(config.monitor.tick_seconds));

    monitor.startup().await;

    Ok(Daemon {
        store,
        service,
        monitor,
    })
}

/// Run the monitor and API until Ctrl-C.
pub async fn run(
    config_path: &Path,
    data_dir: PathBuf,
    listen: Option<SocketAddr>,
) -> anyhow::Result<()> {
    info!("depwatch daemon starting");

    let config = DepwatchConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(path = ?config_path, checks = config.checks.len(), "config loaded");

    let addr = match listen {
        Some(addr) => addr,
        None => config
            .api
            .listen
            .parse()
            .with_context(|| format!("invalid [api] listen address '{}'", config.api.listen))?,
    };

    std::fs::create_dir_all(&data_dir)?;

    // ── Initialize subsystems ──────────────────────────────────

    let Daemon {
        store,
        service,
        monitor,
    } = assemble(&config, &data_dir.join("depwatch.redb")).await?;

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let monitor_handle = tokio::spawn(monitor.run_ticks(shutdown_rx));

    // ── Start API server ───────────────────────────────────────

    let router = depwatch_api::build_router(service, store);

    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C; shutting down");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for the monitor loop.
    let _ = monitor_handle.await;

    info!("depwatch daemon stopped");
    Ok(())
}
