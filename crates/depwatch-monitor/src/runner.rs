//! Check runner — executes one probe under a hard timeout.
//!
//! The runner never fails: timeouts, probe errors and panics all become
//! `Down` outcomes. Successful outcomes go through degraded-latency
//! classification, and every textual field is trimmed and capped to the
//! persisted limits before the outcome is handed back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use depwatch_core::limits;
use depwatch_state::{CheckStatus, ProbeOutcome};

use crate::probe::Probe;

/// `error_type` recorded when a probe exceeds its timeout.
pub const TIMEOUT_ERROR: &str = "Timeout";

/// `error_type` recorded when a probe panics.
pub const PANIC_ERROR: &str = "Panic";

/// Run `probe` bounded by `timeout` and classify the outcome.
///
/// The probe runs on its own task with the timeout applied inside it, so
/// dropping this future (e.g. on shutdown) still leaves the probe bounded.
pub async fn run_check(
    key: &str,
    probe: Arc<dyn Probe>,
    timeout: Duration,
    degraded_threshold_ms: Option<u32>,
) -> ProbeOutcome {
    let started = Instant::now();
    let task =
        tokio::spawn(async move { tokio::time::timeout(timeout, probe.execute(timeout)).await });

    let outcome = match task.await {
        Ok(Ok(Ok(mut outcome))) => {
            if outcome.latency_ms.is_none() {
                outcome.latency_ms = Some(elapsed_ms(started));
            }
            debug!(
                %key,
                status = outcome.status.as_str(),
                latency_ms = ?outcome.latency_ms,
                "probe finished"
            );
            outcome
        }
        Ok(Ok(Err(e))) => {
            warn!(%key, error = %e, kind = e.kind(), "probe failed");
            ProbeOutcome::down(e.kind(), e.to_string()).with_latency_ms(elapsed_ms(started))
        }
        Ok(Err(_)) => {
            warn!(%key, timeout = ?timeout, "probe timed out");
            ProbeOutcome::down(
                TIMEOUT_ERROR,
                format!("probe did not complete within the configured timeout of {timeout:?}"),
            )
            .with_latency_ms(elapsed_ms(started))
        }
        Err(e) => {
            error!(%key, error = %e, "probe task aborted");
            let message = if e.is_panic() {
                "probe panicked".to_string()
            } else {
                e.to_string()
            };
            ProbeOutcome::down(PANIC_ERROR, message).with_latency_ms(elapsed_ms(started))
        }
    };

    normalize(classify_latency(outcome, degraded_threshold_ms))
}

/// Promote `Up` to `Degraded` when latency exceeds the threshold.
///
/// Any other status passes through unchanged.
pub fn classify_latency(
    mut outcome: ProbeOutcome,
    degraded_threshold_ms: Option<u32>,
) -> ProbeOutcome {
    if outcome.status != CheckStatus::Up {
        return outcome;
    }
    if let (Some(threshold), Some(latency)) = (degraded_threshold_ms, outcome.latency_ms) {
        if latency > u64::from(threshold) {
            outcome.status = CheckStatus::Degraded;
            if outcome.message.is_none() {
                outcome.message = Some(format!(
                    "latency {latency}ms exceeds degraded threshold {threshold}ms"
                ));
            }
        }
    }
    outcome
}

/// Trim and cap text fields to the persisted limits.
pub fn normalize(outcome: ProbeOutcome) -> ProbeOutcome {
    ProbeOutcome {
        message: limits::truncate(outcome.message.as_deref(), limits::MESSAGE_MAX_LEN),
        details_json: limits::truncate(outcome.details_json.as_deref(), limits::DETAILS_MAX_LEN),
        error_type: limits::truncate(outcome.error_type.as_deref(), limits::ERROR_TYPE_MAX_LEN),
        error_message: limits::truncate(
            outcome.error_message.as_deref(),
            limits::ERROR_MESSAGE_MAX_LEN,
        ),
        ..outcome
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;
    use async_trait::async_trait;

    struct Fixed(ProbeOutcome);

    #[async_trait]
    impl Probe for Fixed {
        async fn execute(&self, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
            Ok(self.0.clone())
        }
    }

    struct Hangs;

    #[async_trait]
    impl Probe for Hangs {
        async fn execute(&self, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ProbeOutcome::up())
        }
    }

    struct Fails;

    #[async_trait]
    impl Probe for Fails {
        async fn execute(&self, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
            Err(ProbeError::Transport("connection reset by peer".to_string()))
        }
    }

    struct Panics;

    #[async_trait]
    impl Probe for Panics {
        async fn execute(&self, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
            panic!("probe bug");
        }
    }

    struct Slow(Duration);

    #[async_trait]
    impl Probe for Slow {
        async fn execute(&self, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
            tokio::time::sleep(self.0).await;
            Ok(ProbeOutcome::up())
        }
    }

    // ── Classification ─────────────────────────────────────────────

    #[test]
    fn slow_up_becomes_degraded() {
        let outcome = classify_latency(ProbeOutcome::up().with_latency_ms(500), Some(300));
        assert_eq!(outcome.status, CheckStatus::Degraded);
        assert!(outcome.message.unwrap().contains("500ms"));
    }

    #[test]
    fn fast_up_stays_up() {
        let outcome = classify_latency(ProbeOutcome::up().with_latency_ms(200), Some(300));
        assert_eq!(outcome.status, CheckStatus::Up);
        assert!(outcome.message.is_none());
    }

    #[test]
    fn threshold_never_changes_down() {
        let down = ProbeOutcome::down("HttpStatus", "503").with_latency_ms(9999);
        let outcome = classify_latency(down, Some(1));
        assert_eq!(outcome.status, CheckStatus::Down);
    }

    #[test]
    fn probe_reported_degraded_passes_through() {
        let degraded = ProbeOutcome {
            status: CheckStatus::Degraded,
            latency_ms: Some(1),
            ..Default::default()
        };
        let outcome = classify_latency(degraded, Some(1000));
        assert_eq!(outcome.status, CheckStatus::Degraded);
    }

    #[test]
    fn no_threshold_means_no_degradation() {
        let outcome = classify_latency(ProbeOutcome::up().with_latency_ms(60_000), None);
        assert_eq!(outcome.status, CheckStatus::Up);
    }

    #[test]
    fn latency_equal_to_threshold_is_up() {
        let outcome = classify_latency(ProbeOutcome::up().with_latency_ms(300), Some(300));
        assert_eq!(outcome.status, CheckStatus::Up);
    }

    #[test]
    fn normalize_caps_every_text_field() {
        let outcome = ProbeOutcome {
            status: CheckStatus::Down,
            message: Some("m".repeat(600)),
            details_json: Some("d".repeat(20_000)),
            error_type: Some(format!("  {}  ", "t".repeat(300))),
            error_message: Some("e".repeat(1_500)),
            ..Default::default()
        };
        let n = normalize(outcome);
        assert_eq!(n.message.unwrap().len(), 500);
        assert_eq!(n.details_json.unwrap().len(), 16_000);
        assert_eq!(n.error_type.unwrap().len(), 200);
        assert_eq!(n.error_message.unwrap().len(), 1_000);
    }

    // ── Execution ──────────────────────────────────────────────────

    #[tokio::test]
    async fn probe_latency_is_preferred() {
        let probe = Arc::new(Fixed(ProbeOutcome::up().with_latency_ms(750)));
        let outcome = run_check("k", probe, Duration::from_secs(1), Some(500)).await;
        assert_eq!(outcome.latency_ms, Some(750));
        assert_eq!(outcome.status, CheckStatus::Degraded);
    }

    #[tokio::test]
    async fn missing_latency_uses_wall_clock() {
        let probe = Arc::new(Slow(Duration::from_millis(50)));
        let outcome = run_check("k", probe, Duration::from_secs(1), None).await;
        assert_eq!(outcome.status, CheckStatus::Up);
        assert!(outcome.latency_ms.unwrap() >= 50);
    }

    #[tokio::test]
    async fn hung_probe_times_out_within_margin() {
        let started = Instant::now();
        let outcome = run_check("k", Arc::new(Hangs), Duration::from_secs(1), None).await;
        let elapsed = started.elapsed();

        assert_eq!(outcome.status, CheckStatus::Down);
        assert_eq!(outcome.error_type.as_deref(), Some(TIMEOUT_ERROR));
        assert!(outcome.error_message.unwrap().contains("1s"));
        assert!(outcome.latency_ms.unwrap() >= 1000);
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn probe_error_becomes_down() {
        let outcome = run_check("k", Arc::new(Fails), Duration::from_secs(1), Some(1)).await;
        assert_eq!(outcome.status, CheckStatus::Down);
        assert_eq!(outcome.error_type.as_deref(), Some("Transport"));
        assert!(outcome.error_message.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn probe_panic_becomes_down() {
        let outcome = run_check("k", Arc::new(Panics), Duration::from_secs(1), None).await;
        assert_eq!(outcome.status, CheckStatus::Down);
        assert_eq!(outcome.error_type.as_deref(), Some(PANIC_ERROR));
    }

    #[tokio::test]
    async fn oversized_probe_fields_are_truncated() {
        let probe = Arc::new(Fixed(
            ProbeOutcome::up()
                .with_latency_ms(1)
                .with_message("x".repeat(2_000)),
        ));
        let outcome = run_check("k", probe, Duration::from_secs(1), None).await;
        assert_eq!(outcome.message.unwrap().len(), 500);
    }
}
