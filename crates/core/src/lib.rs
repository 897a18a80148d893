//! medscribe-core: form definitions and the extraction contract
//!
//! This crate describes the three supported Kazakhstan medical forms, the
//! prompts and response schema sent to the generative model, the strict
//! parse of its output into an editable document, identity enrichment,
//! consultation history and Word-compatible export. It performs no I/O.

pub mod capture;
pub mod error;
pub mod export;
pub mod form;
pub mod history;
pub mod identity;
pub mod intent;
pub mod prompt;
pub mod record;
pub mod schema;

pub use capture::{AudioClip, AudioRecorder, CaptureSource, CaptureStream};
pub use error::{CaptureError, DocumentError, ExportError};
pub use form::{FormDescriptor, FormType, LanguageHint};
pub use history::{ConsultationHistory, ConsultationHistoryEntry, HistoryStats};
pub use identity::{UserIdentity, merge};
pub use record::{DocumentRecord, FieldValue, ParsedRecord};
pub use schema::{FieldKind, FieldSchema, FieldSpec, schema_for};
