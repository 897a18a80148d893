use async_trait::async_trait;
use medscribe_core::ConsultationHistory;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{HistoryStore, StoreError};

/// Name of the persisted history file inside the data directory
pub const HISTORY_FILE: &str = "medscribe_history.json";

/// History kept as one JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `medscribe_history.json` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(HISTORY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    /// A missing file is an empty history; an unreadable one is discarded
    async fn load(&self) -> Result<ConsultationHistory, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConsultationHistory::new());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(history) => Ok(history),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "History file is corrupt, starting with an empty history"
                );
                Ok(ConsultationHistory::new())
            }
        }
    }

    async fn save(&self, history: &ConsultationHistory) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(history)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), entries = history.len(), "History saved");
        Ok(())
    }
}

/// In-process store for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<ConsultationHistory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of what was last saved
    pub fn snapshot(&self) -> ConsultationHistory {
        self.saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn load(&self) -> Result<ConsultationHistory, StoreError> {
        Ok(self.snapshot())
    }

    async fn save(&self, history: &ConsultationHistory) -> Result<(), StoreError> {
        *self
            .saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = history.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medscribe_core::schema::fields;
    use medscribe_core::{DocumentRecord, FormType};

    fn record(form: FormType, patient: &str) -> DocumentRecord {
        DocumentRecord::empty(form)
            .with_field(fields::PATIENT_NAME, patient.into())
            .unwrap()
            .with_field(fields::SHORT_SUMMARY, "Summary.".into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path().join("nested"));

        let mut history = ConsultationHistory::new();
        history.record(record(FormType::Form075, "First"));
        history.record(record(FormType::Form003, "Second"));
        store.save(&history).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, history);
        assert_eq!(loaded.entries()[0].patient_name, "Second");
        assert!(store.path().ends_with(HISTORY_FILE));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        tokio::fs::write(store.path(), b"{not json").await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        let mut history = ConsultationHistory::new();
        history.record(record(FormType::Form027, "Patient"));

        store.save(&history).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 1);
    }
}
