//! depwatch-api — REST API for depwatch.
//!
//! Thin axum layer over [`StatusService`]; dashboards poll the status
//! route, operators tune checks and trigger manual refreshes.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/status` | Latest status of every enabled check |
//! | POST | `/api/v1/status/refresh` | Rate-limited manual sweep |
//! | GET | `/api/v1/checks` | List check definitions |
//! | PUT | `/api/v1/checks` | Batch update check tunables |
//! | GET | `/api/v1/checks/:id/history` | Recent results for one check |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use depwatch_monitor::StatusService;
use depwatch_state::StateStore;

/// Header naming the caller for refresh rate limiting.
pub const CALLER_HEADER: &str = "x-caller-id";

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<StatusService>,
    pub store: StateStore,
}

/// Build the complete API router.
pub fn build_router(service: Arc<StatusService>, store: StateStore) -> Router {
    let api_state = ApiState { service, store };

    let api_routes = Router::new()
        .route("/status", get(handlers::get_status))
        .route("/status/refresh", post(handlers::refresh_status))
        .route("/checks", get(handlers::list_checks).put(handlers::update_checks))
        .route("/checks/{id}/history", get(handlers::check_history))
        .with_state(api_state);

    Router::new().nest("/api/v1", api_routes)
}
