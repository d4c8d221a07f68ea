//! Node membership endpoints
//!
//! Query-parameter-encoded hostname/port in, registry booleans and
//! membership maps out. All mutating endpoints are idempotent: repeating a
//! call with the same address converges instead of erroring.

use crate::api::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use drover_registry::{Membership, NodeAddress};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Create node membership routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_node))
        .route("/remove", post(remove_node))
        .route("/activate", post(activate_node))
        .route("/deactivate", post(deactivate_node))
        .route("/activated", get(list_activated))
        .route("/deactivated", get(list_deactivated))
}

/// Query parameters naming one node endpoint
#[derive(Debug, Deserialize)]
pub struct NodeQuery {
    /// Node hostname
    pub hostname: String,
    /// Node port
    pub port: u16,
}

impl NodeQuery {
    /// Decode into a validated address; malformed input never reaches the core
    fn address(&self) -> Result<NodeAddress, ApiError> {
        NodeAddress::new(&self.hostname, self.port)
            .map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

/// Result of a mutating membership call
#[derive(Debug, Serialize)]
pub struct OpResponse {
    /// Whether the transition (or idempotent no-op) succeeded
    pub success: bool,
}

/// Register a node as active
///
/// POST /v1/nodes/add
#[instrument(skip(state, query), fields(hostname = %query.hostname, port = query.port), level = "info")]
async fn add_node(
    State(state): State<AppState>,
    Query(query): Query<NodeQuery>,
) -> Result<Json<OpResponse>, ApiError> {
    let addr = query.address()?;
    if !state.registry.add(&addr).await {
        return Err(ApiError::commit_failed());
    }
    Ok(Json(OpResponse { success: true }))
}

/// Remove a node entirely
///
/// POST /v1/nodes/remove
#[instrument(skip(state, query), fields(hostname = %query.hostname, port = query.port), level = "info")]
async fn remove_node(
    State(state): State<AppState>,
    Query(query): Query<NodeQuery>,
) -> Result<Json<OpResponse>, ApiError> {
    let addr = query.address()?;
    if !state.registry.remove(&addr).await {
        return Err(ApiError::commit_failed());
    }
    Ok(Json(OpResponse { success: true }))
}

/// Make a node eligible for work
///
/// POST /v1/nodes/activate
#[instrument(skip(state, query), fields(hostname = %query.hostname, port = query.port), level = "info")]
async fn activate_node(
    State(state): State<AppState>,
    Query(query): Query<NodeQuery>,
) -> Result<Json<OpResponse>, ApiError> {
    let addr = query.address()?;
    if !state.registry.activate(&addr).await {
        return Err(ApiError::commit_failed());
    }
    Ok(Json(OpResponse { success: true }))
}

/// Exclude a node from work assignment
///
/// POST /v1/nodes/deactivate
#[instrument(skip(state, query), fields(hostname = %query.hostname, port = query.port), level = "info")]
async fn deactivate_node(
    State(state): State<AppState>,
    Query(query): Query<NodeQuery>,
) -> Result<Json<OpResponse>, ApiError> {
    let addr = query.address()?;
    if !state.registry.deactivate(&addr).await {
        return Err(ApiError::commit_failed());
    }
    Ok(Json(OpResponse { success: true }))
}

/// List the active set, hostname → ports
///
/// GET /v1/nodes/activated
async fn list_activated(State(state): State<AppState>) -> Json<Membership> {
    Json(state.registry.activated().await)
}

/// List the inactive set, hostname → ports
///
/// GET /v1/nodes/deactivated
async fn list_deactivated(State(state): State<AppState>) -> Json<Membership> {
    Json(state.registry.deactivated().await)
}
