//! Consultation history endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use medscribe_core::{ConsultationHistory, HistoryStats};
use uuid::Uuid;

use crate::error::AppError;
use crate::session::SessionView;
use crate::state::AppState;

/// GET /history - All entries, most recent first
pub async fn list(State(state): State<AppState>) -> Json<ConsultationHistory> {
    Json(state.history().await)
}

/// GET /history/stats
pub async fn stats(State(state): State<AppState>) -> Json<HistoryStats> {
    Json(state.history_stats().await)
}

/// POST /sessions/{id}/history/{entry}/load - Reopen a past document for editing
pub async fn load(
    State(state): State<AppState>,
    Path((id, entry)): Path<(Uuid, Uuid)>,
) -> Result<Json<SessionView>, AppError> {
    let record = state
        .history_record(entry)
        .await
        .ok_or_else(|| AppError::NotFound(format!("History entry {} not found", entry)))?;
    Ok(Json(state.sessions.load_record(id, record)?))
}
