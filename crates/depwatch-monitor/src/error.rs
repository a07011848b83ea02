//! Monitor error types.

use thiserror::Error;

/// Errors that escape a sweep or a service call.
///
/// Probe failures never show up here; they are recorded as `Down` results.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("state store error: {0}")]
    State(#[from] depwatch_state::StateError),

    #[error("sweep task failed: {0}")]
    SweepAborted(String),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
