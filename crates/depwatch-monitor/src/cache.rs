//! Latest snapshot cache.
//!
//! Holds the most recent "all checks, latest status" view. Snapshots are
//! replaced wholesale and shared as `Arc`s, so a reader either sees the
//! previous snapshot or the new one, never a mix.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use depwatch_state::LatestRow;

/// Point-in-time view of every enabled check and its latest result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSnapshot {
    pub retrieved_utc: DateTime<Utc>,
    pub rows: Vec<LatestRow>,
}

impl CacheSnapshot {
    pub fn new(rows: Vec<LatestRow>) -> Self {
        Self {
            retrieved_utc: Utc::now(),
            rows,
        }
    }
}

/// Process-wide holder of the current snapshot. Last writer wins.
#[derive(Default)]
pub struct SnapshotCache {
    current: RwLock<Option<Arc<CacheSnapshot>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, or `None` if the cache was never warmed.
    pub async fn get_snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.current.read().await.clone()
    }

    /// Replace the current snapshot.
    pub async fn set_snapshot(&self, snapshot: CacheSnapshot) {
        let rows = snapshot.rows.len();
        let snapshot = Arc::new(snapshot);
        *self.current.write().await = Some(snapshot);
        debug!(rows, "snapshot cache replaced");
    }
}
