//! Per-session workspace state
//!
//! A session carries the active form, the active document, the clinician
//! identity, an optional recording and at most one in-flight extraction.

use medscribe_core::capture::{DEFAULT_AUDIO_MIME, DEFAULT_MAX_RECORDING_BYTES};
use medscribe_core::{
    AudioClip, AudioRecorder, CaptureError, CaptureSource, CaptureStream, DocumentError,
    DocumentRecord, FieldValue, FormType, UserIdentity, merge,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Errors from session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error("An extraction is already running for this session")]
    Busy,

    #[error("No document has been generated yet")]
    NoDocument,

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

struct Session {
    form_type: FormType,
    identity: Option<UserIdentity>,
    document: Option<DocumentRecord>,
    recorder: AudioRecorder,
    /// Last finished recording, kept so a failed generation can be retried
    clip: Option<AudioClip>,
    in_flight: Option<InFlight>,
}

impl Session {
    fn new(form_type: FormType, identity: Option<UserIdentity>, max_recording_bytes: usize) -> Self {
        Self {
            form_type,
            identity,
            document: None,
            recorder: AudioRecorder::with_limit(max_recording_bytes),
            clip: None,
            in_flight: None,
        }
    }

    fn view(&self, id: Uuid) -> SessionView {
        SessionView {
            id,
            form_type: self.form_type,
            identity: self.identity.clone(),
            document: self.document.clone(),
            recording: self.recorder.is_recording(),
            buffered_bytes: self.recorder.buffered_len(),
            has_recording: self.clip.is_some(),
            extracting: self.in_flight.is_some(),
        }
    }
}

/// Snapshot of a session returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub form_type: FormType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<UserIdentity>,
    pub document: Option<DocumentRecord>,
    pub recording: bool,
    pub buffered_bytes: usize,
    pub has_recording: bool,
    pub extracting: bool,
}

struct Inner {
    sessions: Mutex<HashMap<Uuid, Session>>,
    generation: AtomicU64,
    max_recording_bytes: usize,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            sessions: Mutex::default(),
            generation: AtomicU64::default(),
            max_recording_bytes: DEFAULT_MAX_RECORDING_BYTES,
        }
    }
}

/// Registry of live sessions, cheap to clone
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

/// Holds a session's extraction slot; dropping it frees the slot
pub struct ExtractionGuard {
    registry: SessionRegistry,
    session: Uuid,
    generation: u64,
    token: CancellationToken,
}

impl ExtractionGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for ExtractionGuard {
    fn drop(&mut self) {
        let mut sessions = self.registry.lock();
        if let Some(session) = sessions.get_mut(&self.session) {
            if session
                .in_flight
                .as_ref()
                .is_some_and(|slot| slot.generation == self.generation)
            {
                session.in_flight = None;
            }
        }
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose sessions buffer at most `max_bytes` of recorded audio
    pub fn with_recording_limit(max_bytes: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                max_recording_bytes: max_bytes,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        f(session)
    }

    pub fn create(&self, form_type: FormType, identity: Option<UserIdentity>) -> SessionView {
        let id = Uuid::new_v4();
        let session = Session::new(form_type, identity, self.inner.max_recording_bytes);
        let view = session.view(id);
        self.lock().insert(id, session);
        tracing::info!(session = %id, form = form_type.numeral(), "Session created");
        view
    }

    /// Close a session; a running extraction is cancelled and an open
    /// recording releases its stream when the session drops
    pub fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        let session = self.lock().remove(&id).ok_or(SessionError::NotFound(id))?;
        if let Some(slot) = &session.in_flight {
            slot.token.cancel();
        }
        tracing::info!(session = %id, recording = session.recorder.is_recording(), "Session closed");
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Result<SessionView, SessionError> {
        self.with_session(id, |session| Ok(session.view(id)))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn form_type(&self, id: Uuid) -> Result<FormType, SessionError> {
        self.with_session(id, |session| Ok(session.form_type))
    }

    pub fn document(&self, id: Uuid) -> Result<DocumentRecord, SessionError> {
        self.with_session(id, |session| {
            session.document.clone().ok_or(SessionError::NoDocument)
        })
    }

    /// Switch the active form; a different form discards the current document
    pub fn select_form(&self, id: Uuid, form_type: FormType) -> Result<SessionView, SessionError> {
        self.with_session(id, |session| {
            if session.form_type != form_type {
                session.form_type = form_type;
                session.document = None;
            }
            Ok(session.view(id))
        })
    }

    /// Replace the identity and merge it into the current document
    pub fn set_identity(&self, id: Uuid, identity: UserIdentity) -> Result<SessionView, SessionError> {
        self.with_session(id, |session| {
            if let Some(document) = &session.document {
                session.document = Some(merge(document, &identity));
            }
            session.identity = Some(identity);
            Ok(session.view(id))
        })
    }

    /// Claim the session's single extraction slot
    pub fn begin_extraction(&self, id: Uuid) -> Result<ExtractionGuard, SessionError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        self.with_session(id, |session| {
            if session.in_flight.is_some() {
                return Err(SessionError::Busy);
            }
            session.in_flight = Some(InFlight {
                generation,
                token: token.clone(),
            });
            Ok(())
        })?;

        Ok(ExtractionGuard {
            registry: self.clone(),
            session: id,
            generation,
            token,
        })
    }

    /// Cancel the running extraction, returns whether one was running
    pub fn cancel_extraction(&self, id: Uuid) -> Result<bool, SessionError> {
        self.with_session(id, |session| match &session.in_flight {
            Some(slot) => {
                slot.token.cancel();
                Ok(true)
            }
            None => Ok(false),
        })
    }

    /// Install a fresh extraction result as the active document
    pub fn apply_extraction(&self, id: Uuid, record: DocumentRecord) -> Result<DocumentRecord, SessionError> {
        self.with_session(id, |session| {
            let record = match &session.identity {
                Some(identity) => merge(&record, identity),
                None => record,
            };
            session.form_type = record.form_type;
            session.document = Some(record.clone());
            Ok(record)
        })
    }

    /// Replace the active form and document with a stored snapshot
    pub fn load_record(&self, id: Uuid, record: DocumentRecord) -> Result<SessionView, SessionError> {
        self.with_session(id, |session| {
            session.form_type = record.form_type;
            session.document = Some(record);
            Ok(session.view(id))
        })
    }

    pub fn edit_field(&self, id: Uuid, field: &str, value: FieldValue) -> Result<DocumentRecord, SessionError> {
        self.with_session(id, |session| {
            let document = session.document.as_mut().ok_or(SessionError::NoDocument)?;
            document.set_field(field, value)?;
            Ok(document.clone())
        })
    }

    pub fn start_recording(&self, id: Uuid, source: &dyn CaptureSource) -> Result<SessionView, SessionError> {
        self.with_session(id, |session| {
            session.recorder.start(source)?;
            session.clip = None;
            Ok(session.view(id))
        })
    }

    pub fn push_chunk(&self, id: Uuid, chunk: &[u8]) -> Result<usize, SessionError> {
        self.with_session(id, |session| {
            session.recorder.push_chunk(chunk)?;
            Ok(session.recorder.buffered_len())
        })
    }

    pub fn stop_recording(&self, id: Uuid) -> Result<AudioClip, SessionError> {
        self.with_session(id, |session| {
            let clip = session.recorder.stop()?;
            session.clip = Some(clip.clone());
            Ok(clip)
        })
    }

    /// The clip to generate from, stopping a running recording first
    pub fn recorded_clip(&self, id: Uuid) -> Result<AudioClip, SessionError> {
        self.with_session(id, |session| {
            if session.recorder.is_recording() {
                session.clip = Some(session.recorder.stop()?);
            }
            session
                .clip
                .clone()
                .ok_or(SessionError::Capture(CaptureError::NotRecording))
        })
    }
}

/// Capture source fed by chunks the client uploads over HTTP
#[derive(Debug, Clone)]
pub struct UploadSource {
    enabled: bool,
    mime_type: String,
}

impl UploadSource {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            mime_type: DEFAULT_AUDIO_MIME.to_string(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        if !mime_type.trim().is_empty() {
            self.mime_type = mime_type;
        }
        self
    }
}

struct UploadStream {
    mime_type: String,
}

impl CaptureSource for UploadSource {
    fn acquire(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        if !self.enabled {
            return Err(CaptureError::RecordingDenied(
                "audio recording is disabled on this server".into(),
            ));
        }
        Ok(Box::new(UploadStream {
            mime_type: self.mime_type.clone(),
        }))
    }
}

impl CaptureStream for UploadStream {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn release(self: Box<Self>) {}
}
