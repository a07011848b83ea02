//! Staleness policy: decides whether a definition is due for a new probe.

use chrono::{DateTime, TimeDelta, Utc};

use depwatch_core::limits;

/// Whether a definition last checked at `last_checked_utc` needs a new probe.
///
/// Never-checked definitions are always stale. The interval is clamped to
/// the allowed range here as well, so out-of-range values that slipped past
/// validation cannot stall or flood a check.
pub fn is_stale(
    last_checked_utc: Option<DateTime<Utc>>,
    interval_seconds: u32,
    now: DateTime<Utc>,
) -> bool {
    let Some(last) = last_checked_utc else {
        return true;
    };
    let interval = TimeDelta::seconds(i64::from(limits::clamp_interval(interval_seconds)));
    last <= now - interval
}
