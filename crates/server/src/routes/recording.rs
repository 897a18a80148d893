//! Server-side recording fed by uploaded chunks

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::session::SessionView;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartParams {
    /// Container type of the chunks the client will upload
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResponse {
    buffered_bytes: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    mime_type: String,
    bytes: usize,
}

/// POST /sessions/{id}/recording/start
pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<StartParams>,
) -> Result<Json<SessionView>, AppError> {
    let source = state.recording_source(params.mime_type.as_deref());
    let view = state.sessions.start_recording(id, &source)?;
    tracing::info!(session = %id, "Recording started");
    Ok(Json(view))
}

/// POST /sessions/{id}/recording/chunk - Append raw audio bytes
pub async fn chunk(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ChunkResponse>, AppError> {
    let buffered_bytes = state.sessions.push_chunk(id, &body)?;
    Ok(Json(ChunkResponse { buffered_bytes }))
}

/// POST /sessions/{id}/recording/stop - Finish the recording and keep the clip
pub async fn stop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StopResponse>, AppError> {
    let clip = state.sessions.stop_recording(id)?;
    tracing::info!(session = %id, bytes = clip.len(), "Recording stopped");
    Ok(Json(StopResponse {
        mime_type: clip.mime_type.clone(),
        bytes: clip.len(),
    }))
}
