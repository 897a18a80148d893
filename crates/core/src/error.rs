use thiserror::Error;

use crate::schema::FieldKind;

/// Errors raised while building or editing a document record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Unknown form type: {0}")]
    UnknownFormType(String),

    #[error("Unknown field for form {form}: {field}")]
    UnknownField { form: String, field: String },

    #[error("Field {field} expects a {expected:?} value")]
    TypeMismatch { field: String, expected: FieldKind },

    #[error("Field {field} does not accept value {value:?}")]
    InvalidChoice { field: String, value: String },

    #[error("Model output violates the form schema: {0}")]
    SchemaViolation(String),
}

/// Errors raised by the audio recorder
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Recording permission denied: {0}")]
    RecordingDenied(String),

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("Recording exceeds the {limit} byte limit")]
    TooLarge { limit: usize },
}

/// Errors raised while rendering an export document
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
