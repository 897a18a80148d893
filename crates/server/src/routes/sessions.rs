//! Session HTTP handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use medscribe_core::{DocumentRecord, FieldValue, FormType, UserIdentity};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::session::SessionView;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    #[serde(default)]
    pub form_type: Option<FormType>,
    #[serde(default)]
    pub identity: Option<UserIdentity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectForm {
    pub form_type: FormType,
}

#[derive(Debug, Deserialize)]
pub struct FieldEdit {
    pub field: String,
    pub value: FieldValue,
}

/// POST /sessions - Open a workspace
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateSession>,
) -> (StatusCode, Json<SessionView>) {
    let form = body.form_type.unwrap_or(FormType::Form075);
    let view = state.sessions.create(form, body.identity);
    (StatusCode::CREATED, Json(view))
}

/// GET /sessions/{id}
pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.get(id)?))
}

/// DELETE /sessions/{id} - Close a workspace and free its audio
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /sessions/{id}/form - Switch the active form
pub async fn select_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectForm>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.select_form(id, body.form_type)?))
}

/// PUT /sessions/{id}/identity - Set the signed-in clinician
pub async fn set_identity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(identity): Json<UserIdentity>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.set_identity(id, identity)?))
}

/// GET /sessions/{id}/document
pub async fn document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentRecord>, AppError> {
    Ok(Json(state.sessions.document(id)?))
}

/// PATCH /sessions/{id}/document - Edit one field of the active document
pub async fn edit_field(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<FieldEdit>,
) -> Result<Json<DocumentRecord>, AppError> {
    let document = state.sessions.edit_field(id, &edit.field, edit.value)?;
    tracing::debug!(session = %id, field = %edit.field, "Document field edited");
    Ok(Json(document))
}
