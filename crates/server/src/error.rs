//! Application error handling

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use medscribe_core::{CaptureError, DocumentError, ExportError};
use serde::Serialize;

use crate::ai::ExtractionFailure;
use crate::session::SessionError;

/// Message shown for every failed generation that is not a missing key
pub const GENERATION_FAILED: &str = "Failed to generate form. Please try again.";

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unprocessable(String),
    Conflict { code: &'static str, message: String },
    Forbidden(String),
    PayloadTooLarge(String),
    Extraction(ExtractionFailure),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_field", msg),
            AppError::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "recording_denied", msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "audio_too_large", msg),
            AppError::Extraction(failure) => match failure {
                ExtractionFailure::MissingCredential => (
                    StatusCode::PRECONDITION_FAILED,
                    "missing_credential",
                    "No API key is configured. Provide one to enable generation.".to_string(),
                ),
                ExtractionFailure::Cancelled => (
                    StatusCode::CONFLICT,
                    "cancelled",
                    "Generation was cancelled.".to_string(),
                ),
                ExtractionFailure::NoResponse | ExtractionFailure::Transient(_) => (
                    StatusCode::BAD_GATEWAY,
                    "generation_failed",
                    GENERATION_FAILED.to_string(),
                ),
            },
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error, message })).into_response()
    }
}

impl From<ExtractionFailure> for AppError {
    fn from(failure: ExtractionFailure) -> Self {
        AppError::Extraction(failure)
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::UnknownFormType(_) => AppError::BadRequest(err.to_string()),
            _ => AppError::Unprocessable(err.to_string()),
        }
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::RecordingDenied(_) => AppError::Forbidden(err.to_string()),
            CaptureError::AlreadyRecording => AppError::Conflict {
                code: "already_recording",
                message: err.to_string(),
            },
            CaptureError::NotRecording => AppError::Conflict {
                code: "not_recording",
                message: err.to_string(),
            },
            CaptureError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => AppError::NotFound(err.to_string()),
            SessionError::Busy => AppError::Conflict {
                code: "extraction_in_progress",
                message: err.to_string(),
            },
            SessionError::NoDocument => AppError::Conflict {
                code: "no_document",
                message: err.to_string(),
            },
            SessionError::Document(e) => e.into(),
            SessionError::Capture(e) => e.into(),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Internal(format!("Export failed: {}", err))
    }
}
