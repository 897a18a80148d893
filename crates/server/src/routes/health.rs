//! Health check endpoint

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    /// Whether a generative model credential is available
    ai_configured: bool,
    sessions: usize,
}

/// GET /health - Report liveness and whether generation is available
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        ai_configured: state.gateway().is_configured(),
        sessions: state.sessions.len(),
    })
}
