//! Router-level tests: requests go through axum routing and extractors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use depwatch_api::{CALLER_HEADER, build_router};
use depwatch_monitor::{
    Probe, ProbeError, ProbeRegistry, RefreshLimiter, SnapshotCache, StatusService,
    SweepOrchestrator,
};
use depwatch_state::{DefinitionSeed, DefinitionStore, ProbeOutcome, StateStore};

struct Slow(Duration);

#[async_trait]
impl Probe for Slow {
    async fn execute(&self, _timeout: Duration) -> Result<ProbeOutcome, ProbeError> {
        tokio::time::sleep(self.0).await;
        Ok(ProbeOutcome::up())
    }
}

fn router_with(probe_delay: Duration) -> axum::Router {
    let store = StateStore::open_in_memory().unwrap();
    store
        .ensure_seeded(&[
            DefinitionSeed {
                key: "payments".to_string(),
                display_name: "Payments".to_string(),
                category: "Billing".to_string(),
                is_enabled: true,
                interval_seconds: 60,
                timeout_seconds: 5,
                degraded_threshold_ms: None,
            },
            DefinitionSeed {
                key: "archive".to_string(),
                display_name: "Archive".to_string(),
                category: "Storage".to_string(),
                is_enabled: false,
                interval_seconds: 60,
                timeout_seconds: 5,
                degraded_threshold_ms: None,
            },
        ])
        .unwrap();

    let cache = Arc::new(SnapshotCache::new());
    let orchestrator = Arc::new(SweepOrchestrator::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(ProbeRegistry::new().with("payments", Arc::new(Slow(probe_delay)))),
        cache.clone(),
    ));
    let service = StatusService::new(
        cache,
        Arc::new(store.clone()),
        orchestrator,
        Arc::new(RefreshLimiter::default()),
    );
    build_router(Arc::new(service), store)
}

async fn json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn refresh_request(caller: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/status/refresh")
        .header(CALLER_HEADER, caller)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn status_route_serves_snapshot() {
    let router = router_with(Duration::ZERO);
    let req = Request::builder()
        .uri("/api/v1/status")
        .body(Body::empty())
        .unwrap();

    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["rows"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn checks_route_parses_query() {
    let router = router_with(Duration::ZERO);
    let req = Request::builder()
        .uri("/api/v1/checks?include_disabled=true")
        .body(Body::empty())
        .unwrap();

    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    let keys: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys, ["payments", "archive"]);
}

#[tokio::test]
async fn put_checks_rejects_malformed_body() {
    let router = router_with(Duration::ZERO);
    let req = Request::builder()
        .method("PUT")
        .uri("/api/v1/checks")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"not":"a list"}"#))
        .unwrap();

    let resp = router.oneshot(req).await.unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn overlapping_refreshes_report_already_running() {
    let router = router_with(Duration::from_millis(300));

    let first = tokio::spawn(router.clone().oneshot(refresh_request("alice")));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = router.clone().oneshot(refresh_request("bob")).await.unwrap();
    assert_eq!(second.status(), StatusCode::ACCEPTED);
    assert_eq!(json(second).await["data"]["state"], "already_running");

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(json(first).await["data"]["state"], "completed");
}

#[tokio::test]
async fn history_route_rejects_non_numeric_id() {
    let router = router_with(Duration::ZERO);
    let req = Request::builder()
        .uri("/api/v1/checks/abc/history")
        .body(Body::empty())
        .unwrap();

    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
