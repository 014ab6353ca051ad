//! HTTP route handlers for the branch view API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::tree::core::display::{DisplayNode, NormalizedTree};
use crate::tree::core::ids::NodeId;
use crate::tree::navigation::planner::{Step, plan_steps};
use crate::tree::normalize::export;

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/normalize", post(normalize))
        .route("/api/plan", post(plan))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "branchview",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Normalize a conversation export or a bare mapping.
async fn normalize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<NormalizedTree>, (StatusCode, String)> {
    let conversation = export::from_value(body)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid export: {e}")))?;
    Ok(Json(state.normalizer.normalize(&conversation.mapping)))
}

/// Plan request.
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    /// Display nodes with current visibility.
    pub nodes: Vec<DisplayNode>,
    /// Node to reveal.
    pub target: NodeId,
}

/// Plan response.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    /// Steps in execution order.
    pub steps: Vec<Step>,
    /// Number of steps.
    pub count: usize,
}

/// Plan the steps that reveal a node.
async fn plan(Json(request): Json<PlanRequest>) -> Json<PlanResponse> {
    let steps = plan_steps(&request.nodes, request.target.as_str());
    let count = steps.len();
    Json(PlanResponse { steps, count })
}
