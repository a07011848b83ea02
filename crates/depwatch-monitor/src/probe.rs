//! Probe seam: one implementation per monitored dependency.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use depwatch_state::ProbeOutcome;

/// Executes one health check against an external dependency.
///
/// Ordinary failures (connection refused, non-2xx) should be reported as a
/// `Down` outcome, not as an error. Implementations must stop promptly when
/// their future is dropped.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn execute(&self, timeout: Duration) -> Result<ProbeOutcome, ProbeError>;
}

/// Unexpected probe faults.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    /// Stable classification recorded as a result's `error_type`.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::InvalidRequest(_) => "InvalidRequest",
            ProbeError::Transport(_) => "Transport",
            ProbeError::InvalidResponse(_) => "InvalidResponse",
            ProbeError::Other(_) => "ProbeError",
        }
    }
}

/// Probes indexed by definition key.
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    probes: HashMap<String, Arc<dyn Probe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a probe, replacing any previous one for `key`.
    pub fn register(&mut self, key: impl Into<String>, probe: Arc<dyn Probe>) {
        self.probes.insert(key.into(), probe);
    }

    pub fn with(mut self, key: impl Into<String>, probe: Arc<dyn Probe>) -> Self {
        self.register(key, probe);
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn Probe>> {
        self.probes.get(key).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.probes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

impl fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_unstable();
        f.debug_set().entries(keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysUp;

    #[async_trait]
    impl Probe for AlwaysUp {
        async fn execute(&self, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
            Ok(ProbeOutcome::up())
        }
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(ProbeError::Transport("x".into()).kind(), "Transport");
        assert_eq!(ProbeError::Other("x".into()).kind(), "ProbeError");
        assert_eq!(
            ProbeError::InvalidResponse("bad json".into()).to_string(),
            "invalid response: bad json"
        );
    }

    #[tokio::test]
    async fn registry_lookup_is_exact() {
        let registry = ProbeRegistry::new().with("github", Arc::new(AlwaysUp));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("GitHub").is_none());

        assert_eq!(format!("{registry:?}"), r#"{"github"}"#);

        let probe = registry.get("github").unwrap();
        let outcome = probe.execute(Duration::from_secs(1)).await.unwrap();
        assert_eq!(outcome, ProbeOutcome::up());
    }
}
