//! Refresh rate limiter — one cooldown window per caller key.
//!
//! Guards the manual refresh path so a caller cannot trigger sweeps more
//! often than once per window. Keys are case-insensitive; blank keys share
//! a single anonymous bucket.
//!
//! Entries are never evicted. Caller keys must come from a bounded, trusted
//! set (operator ids, internal addresses), not from arbitrary input.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tracing::debug;

/// Bucket shared by every caller without a key.
pub const ANONYMOUS_KEY: &str = "__anonymous__";

/// Default cooldown between refreshes for one caller.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

/// Outcome of a refresh permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshDecision {
    pub allowed: bool,
    /// Zero when allowed, otherwise at least one.
    pub retry_after_seconds: u64,
}

impl RefreshDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_seconds: 0,
        }
    }

    fn deny(retry_after_seconds: u64) -> Self {
        Self {
            allowed: false,
            retry_after_seconds: retry_after_seconds.max(1),
        }
    }
}

/// Per-key cooldown tracker.
pub struct RefreshLimiter {
    window: TimeDelta,
    /// Normalized key → last allowed timestamp.
    last_run: DashMap<String, DateTime<Utc>>,
}

impl RefreshLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window: TimeDelta::milliseconds(window.as_millis() as i64),
            last_run: DashMap::new(),
        }
    }

    /// Check and, when allowed, record `now` for `key`.
    ///
    /// The check and the update happen under the key's shard lock, so two
    /// callers racing on one key cannot both be allowed inside a window.
    pub fn try_acquire(&self, key: &str, now: DateTime<Utc>) -> RefreshDecision {
        let key = normalize_key(key);
        match self.last_run.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(now);
                RefreshDecision::allow()
            }
            Entry::Occupied(mut entry) => {
                let elapsed = (now - *entry.get()).max(TimeDelta::zero());
                if elapsed >= self.window {
                    entry.insert(now);
                    RefreshDecision::allow()
                } else {
                    let remaining_us = (self.window - elapsed)
                        .num_microseconds()
                        .unwrap_or(i64::MAX);
                    let retry = (remaining_us as u64).div_ceil(1_000_000);
                    debug!(key = %entry.key(), retry_after = retry, "refresh rate limited");
                    RefreshDecision::deny(retry)
                }
            }
        }
    }

    /// Number of distinct keys seen so far.
    pub fn tracked_keys(&self) -> usize {
        self.last_run.len()
    }
}

impl Default for RefreshLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn normalize_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        ANONYMOUS_KEY.to_string()
    } else {
        trimmed.to_lowercase()
    }
}
