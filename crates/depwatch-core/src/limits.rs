//! Field length limits and tunable ranges for check definitions and results.

use std::ops::RangeInclusive;

/// Maximum length of a definition key.
pub const KEY_MAX_LEN: usize = 100;
/// Maximum length of a definition display name.
pub const DISPLAY_NAME_MAX_LEN: usize = 200;
/// Maximum length of a definition category.
pub const CATEGORY_MAX_LEN: usize = 100;

/// Maximum length of a result message.
pub const MESSAGE_MAX_LEN: usize = 500;
/// Maximum length of a result details payload.
pub const DETAILS_MAX_LEN: usize = 16_000;
/// Maximum length of a result error type.
pub const ERROR_TYPE_MAX_LEN: usize = 200;
/// Maximum length of a result error message.
pub const ERROR_MESSAGE_MAX_LEN: usize = 1_000;

/// Allowed poll interval, in seconds.
pub const INTERVAL_SECONDS: RangeInclusive<u32> = 5..=86_400;
/// Allowed probe timeout, in seconds.
pub const TIMEOUT_SECONDS: RangeInclusive<u32> = 1..=120;
/// Allowed degraded-latency threshold, in milliseconds.
pub const DEGRADED_THRESHOLD_MS: RangeInclusive<u32> = 1..=300_000;

/// Clamp a poll interval into [`INTERVAL_SECONDS`].
pub fn clamp_interval(seconds: u32) -> u32 {
    seconds.clamp(*INTERVAL_SECONDS.start(), *INTERVAL_SECONDS.end())
}

/// Clamp a probe timeout into [`TIMEOUT_SECONDS`].
pub fn clamp_timeout(seconds: u32) -> u32 {
    seconds.clamp(*TIMEOUT_SECONDS.start(), *TIMEOUT_SECONDS.end())
}

/// Trim surrounding whitespace and cap to `max` characters.
///
/// Counts `char`s, not bytes, so multi-byte text is never split mid-codepoint.
/// Returns `None` for empty or whitespace-only input.
pub fn truncate(value: Option<&str>, max: usize) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.char_indices().nth(max) {
        Some((idx, _)) => Some(trimmed[..idx].to_string()),
        None => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_interval_bounds() {
        assert_eq!(clamp_interval(0), 5);
        assert_eq!(clamp_interval(60), 60);
        assert_eq!(clamp_interval(1_000_000), 86_400);
    }

    #[test]
    fn clamp_timeout_bounds() {
        assert_eq!(clamp_timeout(0), 1);
        assert_eq!(clamp_timeout(500), 120);
    }

    #[test]
    fn truncate_trims_and_caps() {
        assert_eq!(truncate(Some("  hello  "), 10), Some("hello".to_string()));
        assert_eq!(truncate(Some("abcdef"), 3), Some("abc".to_string()));
        assert_eq!(truncate(Some("   "), 3), None);
        assert_eq!(truncate(None, 3), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate(Some("héllo"), 2), Some("hé".to_string()));
    }
}
