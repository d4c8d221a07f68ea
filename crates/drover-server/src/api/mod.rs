//! REST API module
//!
//! Administrative control surface for the node registry. Assumed
//! same-origin/trusted network; there is no auth layer.

pub mod nodes;

use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest("/v1/nodes", nodes::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    instance_id: String,
    uptime_seconds: u64,
}

/// Error body rendered to HTTP callers
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
    message: String,
}

/// API error type that converts to HTTP responses
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: "bad_request".to_string(),
                message: message.into(),
            },
        }
    }

    /// Storage declined or failed the durable write; the transition was not
    /// applied and may be retried by the caller.
    pub fn commit_failed() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: ErrorResponse {
                error: "commit_failed".to_string(),
                message: "membership transition was not durably committed".to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
