//! Document generation endpoints

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use medscribe_core::capture::DEFAULT_AUDIO_MIME;
use medscribe_core::{AudioClip, DocumentRecord, FormType, LanguageHint};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::{ExtractionFailure, ExtractionInput, ExtractionRequest};
use crate::error::AppError;
use crate::state::AppState;

/// Base64-encoded audio sent inline
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioPayload {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

/// Body of `POST /sessions/{id}/extract`; exactly one source must be given
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub audio: Option<AudioPayload>,
    #[serde(default)]
    pub use_recording: bool,
    #[serde(default)]
    pub language_hint: LanguageHint,
    /// Switch forms when the consultation names one explicitly
    #[serde(default)]
    pub detect_form: bool,
    #[serde(default)]
    pub form_type: Option<FormType>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub form_type: FormType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_form: Option<FormType>,
    pub document: DocumentRecord,
    pub history_entry: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    cancelled: bool,
}

impl ExtractBody {
    fn input(self, state: &AppState, id: Uuid) -> Result<ExtractionInput, AppError> {
        let sources = [self.text.is_some(), self.audio.is_some(), self.use_recording];
        if sources.into_iter().filter(|given| *given).count() != 1 {
            return Err(AppError::BadRequest(
                "Provide exactly one of text, audio or useRecording".into(),
            ));
        }

        if let Some(text) = self.text {
            if text.trim().is_empty() {
                return Err(AppError::BadRequest("Consultation text is empty".into()));
            }
            return Ok(ExtractionInput::Text(text));
        }

        let clip = match self.audio {
            Some(audio) => {
                let bytes = BASE64
                    .decode(audio.data.trim())
                    .map_err(|e| AppError::BadRequest(format!("Invalid base64 audio: {}", e)))?;
                let mime = audio
                    .mime_type
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_string());
                AudioClip::new(mime, bytes)
            }
            None => state.sessions.recorded_clip(id)?,
        };

        if clip.is_empty() {
            return Err(AppError::BadRequest("Recorded audio is empty".into()));
        }
        Ok(ExtractionInput::Audio(clip))
    }
}

/// POST /sessions/{id}/extract - Generate the active form from a consultation.
///
/// The session only changes once a document comes back: a rejected body or
/// a failed generation leaves the active form and document as they were.
pub async fn run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ExtractBody>,
) -> Result<Json<ExtractResponse>, AppError> {
    let guard = state.sessions.begin_extraction(id)?;

    let requested_form = body.form_type;
    let detect_form = body.detect_form;
    let language = body.language_hint;
    let input = body.input(&state, id)?;
    let gateway = state.gateway();

    let mut form_type = match requested_form {
        Some(form) => form,
        None => state.sessions.form_type(id)?,
    };

    let mut detected_form = None;
    if detect_form {
        detected_form = tokio::select! {
            _ = guard.token().cancelled() => return Err(ExtractionFailure::Cancelled.into()),
            form = gateway.classify_form_intent(&input) => form,
        };
        if let Some(form) = detected_form {
            tracing::info!(session = %id, form = form.numeral(), "Form switch requested in consultation");
            form_type = form;
        }
    }

    let request = ExtractionRequest::new(input, form_type, language);
    let record = gateway.extract(&request, guard.token()).await?;

    let document = state.sessions.apply_extraction(id, record)?;
    let entry = state.record_history(document.clone()).await;
    drop(guard);

    Ok(Json(ExtractResponse {
        form_type: document.form_type,
        detected_form,
        document,
        history_entry: entry.id,
    }))
}

/// DELETE /sessions/{id}/extract - Cancel the running generation
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<CancelResponse>), AppError> {
    let cancelled = state.sessions.cancel_extraction(id)?;
    if cancelled {
        tracing::info!(session = %id, "Extraction cancelled by client");
    }
    Ok((StatusCode::OK, Json(CancelResponse { cancelled })))
}
