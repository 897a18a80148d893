//! Shared application state

use medscribe_core::{ConsultationHistory, ConsultationHistoryEntry, DocumentRecord, HistoryStats};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::ai::{
    Credential, CredentialOrigin, CredentialResolver, ExtractionGateway, GeminiClient, GenerativeModel,
    ModelFactory,
};
use crate::config::{AiConfig, Config};
use crate::session::{SessionRegistry, UploadSource};
use crate::store::HistoryStore;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<RwLock<Arc<ExtractionGateway>>>,
    factory: ModelFactory,
    pub sessions: SessionRegistry,
    history: Arc<Mutex<ConsultationHistory>>,
    store: Arc<dyn HistoryStore>,
    recording_enabled: bool,
    intent_timeout: Duration,
}

/// Model factory producing live Gemini clients
pub fn gemini_factory(config: &AiConfig) -> ModelFactory {
    let config = config.clone();
    Arc::new(move |credential: &Credential| {
        Arc::new(GeminiClient::new(credential.secret().to_string(), &config)) as Arc<dyn GenerativeModel>
    })
}

impl AppState {
    pub fn new(
        gateway: ExtractionGateway,
        factory: ModelFactory,
        store: Arc<dyn HistoryStore>,
        history: ConsultationHistory,
        config: &Config,
    ) -> Self {
        let intent_timeout = config.ai.intent_timeout;
        Self {
            gateway: Arc::new(RwLock::new(Arc::new(gateway.with_intent_timeout(intent_timeout)))),
            factory,
            sessions: SessionRegistry::with_recording_limit(config.max_audio_bytes),
            history: Arc::new(Mutex::new(history)),
            store,
            recording_enabled: config.recording_enabled,
            intent_timeout,
        }
    }

    /// Gateway for one request; a later credential change does not affect it
    pub fn gateway(&self) -> Arc<ExtractionGateway> {
        self.gateway
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rebuild the gateway around a manually supplied key.
    ///
    /// A blank key drops the override and falls back to the environment.
    pub fn set_credential(&self, key: &str) -> Option<CredentialOrigin> {
        let resolver = CredentialResolver::default().with_override(key);
        let origin = resolver.resolve().map(|credential| credential.origin);
        let gateway = ExtractionGateway::from_resolver(&resolver, &self.factory)
            .with_intent_timeout(self.intent_timeout);

        *self
            .gateway
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(gateway);
        origin
    }

    pub fn recording_source(&self, mime_type: Option<&str>) -> UploadSource {
        let source = UploadSource::new(self.recording_enabled);
        match mime_type {
            Some(mime) => source.with_mime_type(mime),
            None => source,
        }
    }

    /// Prepend a generated document to the history and persist it.
    ///
    /// The lock is held across the save so writes never interleave. A failed
    /// save is logged and the in-memory entry is kept.
    pub async fn record_history(&self, record: DocumentRecord) -> ConsultationHistoryEntry {
        let mut history = self.history.lock().await;
        let entry = history.record(record).clone();

        if let Err(e) = self.store.save(&history).await {
            tracing::error!(error = %e, "Failed to persist consultation history");
        }
        entry
    }

    pub async fn history(&self) -> ConsultationHistory {
        self.history.lock().await.clone()
    }

    pub async fn history_stats(&self) -> HistoryStats {
        self.history.lock().await.stats()
    }

    /// Copy of a stored record, the entry itself stays untouched
    pub async fn history_record(&self, entry: Uuid) -> Option<DocumentRecord> {
        self.history.lock().await.load(entry)
    }
}
