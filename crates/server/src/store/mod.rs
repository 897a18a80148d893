//! Consultation history persistence

mod history;

pub use history::{HISTORY_FILE, JsonFileStore, MemoryStore};

use async_trait::async_trait;
use medscribe_core::ConsultationHistory;

/// Errors reading or writing the history file
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("history I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("history serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Backing storage for the history log, always read and written whole
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self) -> Result<ConsultationHistory, StoreError>;

    async fn save(&self, history: &ConsultationHistory) -> Result<(), StoreError>;
}
