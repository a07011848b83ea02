//! HTTP reachability probe.
//!
//! Issues a GET and looks only at the status line; the body is never read.
//! 2xx means up, anything else is recorded as down with the status code.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use depwatch_state::ProbeOutcome;

use crate::probe::{Probe, ProbeError};

const USER_AGENT: &str = concat!("depwatch/", env!("CARGO_PKG_VERSION"));

/// Probe that GETs one URL.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: Url,
    client: Client,
}

impl HttpProbe {
    pub fn new(url: &str) -> Result<Self, ProbeError> {
        let url = Url::parse(url).map_err(|e| ProbeError::InvalidRequest(format!("{url}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProbeError::InvalidRequest(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProbeError::InvalidRequest(e.to_string()))?;
        Ok(Self { url, client })
    }

    fn details(&self, status: Option<u16>) -> String {
        serde_json::json!({ "url": self.url.as_str(), "status": status }).to_string()
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn execute(&self, timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        let started = Instant::now();
        let response = self
            .client
            .get(self.url.clone())
            .timeout(timeout)
            .send()
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_builder() => return Err(ProbeError::InvalidRequest(e.to_string())),
            Err(e) => {
                let kind = if e.is_timeout() {
                    "Timeout"
                } else if e.is_connect() {
                    "Connect"
                } else if e.is_redirect() {
                    "Redirect"
                } else if e.is_request() {
                    "Request"
                } else {
                    "Transport"
                };
                debug!(url = %self.url, error = %e, kind, "http probe failed");
                return Ok(ProbeOutcome::down(kind, e.to_string())
                    .with_latency_ms(latency_ms)
                    .with_details_json(self.details(None)));
            }
        };

        let status = response.status();
        let code = status.as_u16();
        let outcome = if status.is_success() {
            ProbeOutcome::up().with_message(format!("HTTP {code}"))
        } else {
            ProbeOutcome::down("HttpStatus", format!("unexpected status {status}"))
        };
        Ok(outcome
            .with_latency_ms(latency_ms)
            .with_http_status(code)
            .with_details_json(self.details(Some(code))))
    }
}
