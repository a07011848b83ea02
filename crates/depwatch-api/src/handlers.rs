//! REST API handlers.
//!
//! Reads go through `StatusService`; history comes straight from the store.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::warn;

use depwatch_monitor::{MonitorError, RefreshOutcome};
use depwatch_state::{DefinitionId, DefinitionStore, DefinitionUpdate, StateError};

use crate::{ApiState, CALLER_HEADER};

/// Default and maximum page size for history reads.
const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }

    /// Failure that still carries a payload the caller can act on.
    fn denied(data: T, msg: &str) -> Json<Self> {
        Json(Self {
            success: false,
            data: Some(data),
            error: Some(msg.to_string()),
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn state_error_status(e: &StateError) -> StatusCode {
    match e {
        StateError::NotFound(_) => StatusCode::NOT_FOUND,
        StateError::Invalid(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn monitor_error_response(e: MonitorError) -> axum::response::Response {
    let status = match &e {
        MonitorError::State(inner) => state_error_status(inner),
        MonitorError::SweepAborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(error = %e, "request failed");
    }
    error_response(&e.to_string(), status).into_response()
}

// ── Status ─────────────────────────────────────────────────────

/// GET /api/v1/status
pub async fn get_status(State(state): State<ApiState>) -> impl IntoResponse {
    match state.service.get_snapshot().await {
        Ok(snapshot) => ApiResponse::ok(&*snapshot).into_response(),
        Err(e) => monitor_error_response(e),
    }
}

/// POST /api/v1/status/refresh
pub async fn refresh_status(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let caller = headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match state.service.trigger_refresh(caller).await {
        Ok(outcome @ RefreshOutcome::RateLimited { retry_after_seconds }) => (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, retry_after_seconds.to_string())],
            ApiResponse::denied(outcome, "refresh rate limited"),
        )
            .into_response(),
        Ok(outcome @ RefreshOutcome::AlreadyRunning) => {
            (StatusCode::ACCEPTED, ApiResponse::ok(outcome)).into_response()
        }
        Ok(outcome) => ApiResponse::ok(outcome).into_response(),
        Err(e) => monitor_error_response(e),
    }
}

// ── Checks ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListChecksQuery {
    #[serde(default)]
    pub include_disabled: bool,
}

/// GET /api/v1/checks
pub async fn list_checks(
    State(state): State<ApiState>,
    Query(query): Query<ListChecksQuery>,
) -> impl IntoResponse {
    match state.service.definitions().list_definitions(query.include_disabled) {
        Ok(defs) => ApiResponse::ok(defs).into_response(),
        Err(e) => monitor_error_response(e.into()),
    }
}

/// PUT /api/v1/checks
///
/// All-or-nothing: one unknown id or invalid value rejects the whole batch.
pub async fn update_checks(
    State(state): State<ApiState>,
    Json(updates): Json<Vec<DefinitionUpdate>>,
) -> impl IntoResponse {
    match state.service.update_definitions(&updates).await {
        Ok(updated) => ApiResponse::ok(serde_json::json!({ "updated": updated })).into_response(),
        Err(e) => monitor_error_response(e),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/checks/:id/history
pub async fn check_history(
    State(state): State<ApiState>,
    Path(id): Path<DefinitionId>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    match state.store.get_definition(id) {
        Ok(Some(_)) => {}
        Ok(None) => return error_response("check not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => return monitor_error_response(e.into()),
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    match state.store.list_history(id, limit) {
        Ok(results) => ApiResponse::ok(results).into_response(),
        Err(e) => monitor_error_response(e.into()),
    }
}
