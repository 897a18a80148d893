//! Generative model integration: extraction and intent detection

pub mod client;
pub mod credentials;
pub mod extraction;
mod intent;

pub use client::{GeminiClient, GenerationRequest, GenerativeModel, ModelError, Part};
pub use credentials::{Credential, CredentialOrigin, CredentialResolver};
pub use extraction::{
    DEFAULT_INTENT_TIMEOUT, ExtractionFailure, ExtractionGateway, ExtractionInput, ExtractionRequest, ExtractionResult,
    ModelFactory,
};
