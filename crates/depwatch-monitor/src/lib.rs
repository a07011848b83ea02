//! depwatch-monitor — the status monitoring engine.
//!
//! Periodically probes external dependencies, classifies each outcome as
//! up / degraded / down, persists history and keeps an in-memory snapshot
//! of the latest status for dashboard reads.
//!
//! # Architecture
//!
//! ```text
//! StatusMonitor (background loop, fixed tick)
//!   └── SweepOrchestrator::refresh_stale_checks()  ◄── StatusService::trigger_refresh()
//!         ├── SweepGate (single-flight, try-enter only)      (RefreshLimiter first)
//!         ├── schedule::is_stale() filters definitions
//!         ├── runner::run_check() per definition (bounded parallel)
//!         │     └── Probe::execute(timeout) → ProbeOutcome
//!         ├── ResultStore::insert_result()
//!         └── SnapshotCache::set_snapshot(list_latest())
//!
//! StatusService::get_snapshot() → SnapshotCache, falling back to the store
//! ```
//!
//! # Initialization order
//!
//! Seed definitions, warm the cache with one sweep, then serve reads. A
//! failed warm-up leaves the cache empty, which readers treat as "no data
//! yet" and answer from the store directly.

pub mod cache;
pub mod error;
pub mod http;
pub mod limiter;
pub mod monitor;
pub mod orchestrator;
pub mod probe;
pub mod runner;
pub mod schedule;
pub mod service;

pub use cache::{CacheSnapshot, SnapshotCache};
pub use error::{MonitorError, MonitorResult};
pub use http::HttpProbe;
pub use limiter::{RefreshDecision, RefreshLimiter};
pub use monitor::StatusMonitor;
pub use orchestrator::{SweepGate, SweepOrchestrator, SweepOutcome, SweepReport};
pub use probe::{Probe, ProbeError, ProbeRegistry};
pub use runner::run_check;
pub use schedule::is_stale;
pub use service::{RefreshOutcome, StatusService};
