//! Structured field extraction from a consultation
//!
//! The gateway owns an explicitly constructed model handle. Changing the
//! credential means building a new gateway, never mutating this one.

use medscribe_core::prompt::{build_prompt, build_text_prompt};
use medscribe_core::{AudioClip, DocumentRecord, FormType, LanguageHint};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::client::{GenerationRequest, GenerativeModel, ModelError, Part};
use super::credentials::{Credential, CredentialResolver};

/// Low sampling temperature for near-deterministic extraction
pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// How long form-intent classification may hold up an extraction
pub const DEFAULT_INTENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Consultation content handed to the model
#[derive(Debug, Clone)]
pub enum ExtractionInput {
    Audio(AudioClip),
    Text(String),
}

impl ExtractionInput {
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionInput::Audio(_) => "audio",
            ExtractionInput::Text(_) => "text",
        }
    }
}

/// One generation attempt
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub input: ExtractionInput,
    pub form_type: FormType,
    pub language: LanguageHint,
}

impl ExtractionRequest {
    pub fn new(input: ExtractionInput, form_type: FormType, language: LanguageHint) -> Self {
        Self {
            input,
            form_type,
            language,
        }
    }

    fn to_generation(&self) -> GenerationRequest {
        let parts = match &self.input {
            ExtractionInput::Audio(clip) => vec![
                Part::InlineData {
                    mime_type: clip.mime_type.clone(),
                    data: clip.shared_bytes(),
                },
                Part::Text(build_prompt(self.form_type, self.language)),
            ],
            ExtractionInput::Text(notes) => vec![Part::Text(build_text_prompt(
                self.form_type,
                self.language,
                notes,
            ))],
        };

        GenerationRequest {
            parts,
            response_schema: Some(self.form_type.schema().response_schema()),
            temperature: EXTRACTION_TEMPERATURE,
        }
    }
}

/// Why an extraction produced no document
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("the model returned an empty response")]
    NoResponse,

    #[error("extraction failed: {0}")]
    Transient(String),

    #[error("extraction cancelled")]
    Cancelled,
}

impl ExtractionFailure {
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionFailure::MissingCredential => "missing_credential",
            ExtractionFailure::NoResponse => "no_response",
            ExtractionFailure::Transient(_) => "transient",
            ExtractionFailure::Cancelled => "cancelled",
        }
    }
}

impl From<ModelError> for ExtractionFailure {
    fn from(err: ModelError) -> Self {
        ExtractionFailure::Transient(err.to_string())
    }
}

pub type ExtractionResult = Result<DocumentRecord, ExtractionFailure>;

/// Builds a model handle for a resolved credential
pub type ModelFactory = Arc<dyn Fn(&Credential) -> Arc<dyn GenerativeModel> + Send + Sync>;

/// Entry point for extraction and intent classification
#[derive(Clone)]
pub struct ExtractionGateway {
    model: Option<Arc<dyn GenerativeModel>>,
    intent_timeout: Duration,
}

impl std::fmt::Debug for ExtractionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionGateway")
            .field("configured", &self.is_configured())
            .field("intent_timeout", &self.intent_timeout)
            .finish()
    }
}

impl ExtractionGateway {
    pub fn new(model: Option<Arc<dyn GenerativeModel>>) -> Self {
        Self {
            model,
            intent_timeout: DEFAULT_INTENT_TIMEOUT,
        }
    }

    pub fn with_intent_timeout(mut self, timeout: Duration) -> Self {
        self.intent_timeout = timeout;
        self
    }

    /// Resolve the credential once and build the model handle from it
    pub fn from_resolver(resolver: &CredentialResolver, factory: &ModelFactory) -> Self {
        match resolver.resolve() {
            Some(credential) => {
                tracing::info!(origin = ?credential.origin, "Generative model credential resolved");
                Self::new(Some(factory(&credential)))
            }
            None => {
                tracing::warn!("No generative model credential found, extraction disabled");
                Self::new(None)
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    pub(crate) fn model(&self) -> Option<&Arc<dyn GenerativeModel>> {
        self.model.as_ref()
    }

    pub(crate) fn intent_timeout(&self) -> Duration {
        self.intent_timeout
    }

    /// Run one extraction.
    ///
    /// Makes at most one model call and never retries. Without a credential
    /// it fails fast with `MissingCredential`; a cancelled token abandons the
    /// pending call.
    pub async fn extract(
        &self,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
    ) -> ExtractionResult {
        let form = request.form_type.numeral();
        let result = self.run(request, cancel).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(failure) => failure.label(),
        };
        metrics::counter!("extractions_total", "form" => form, "outcome" => outcome).increment(1);

        match &result {
            Ok(_) => tracing::info!(form, input = request.input.kind(), "Extraction succeeded"),
            Err(failure) => {
                tracing::warn!(form, input = request.input.kind(), error = %failure, "Extraction failed")
            }
        }
        result
    }

    async fn run(&self, request: &ExtractionRequest, cancel: &CancellationToken) -> ExtractionResult {
        let model = self.model.as_ref().ok_or(ExtractionFailure::MissingCredential)?;
        let generation = request.to_generation();

        let reply = tokio::select! {
            _ = cancel.cancelled() => return Err(ExtractionFailure::Cancelled),
            reply = model.generate(generation) => reply?,
        };

        let text = reply
            .filter(|text| !text.trim().is_empty())
            .ok_or(ExtractionFailure::NoResponse)?;

        let parsed = DocumentRecord::from_model_output(request.form_type, &text)
            .map_err(|e| ExtractionFailure::Transient(e.to_string()))?;

        if !parsed.ignored.is_empty() {
            tracing::warn!(
                form = request.form_type.numeral(),
                ignored = ?parsed.ignored,
                "Model returned keys outside the form schema"
            );
        }
        Ok(parsed.record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use medscribe_core::schema::fields;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted model that records every request it receives
    #[derive(Default)]
    pub struct ScriptedModel {
        pub replies: Mutex<Vec<Result<Option<String>, ModelError>>>,
        pub calls: AtomicUsize,
        pub requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedModel {
        pub fn replying(replies: Vec<Result<Option<String>, ModelError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, request: GenerationRequest) -> Result<Option<String>, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(None)
            } else {
                replies.remove(0)
            }
        }
    }

    /// Model that never answers
    pub struct StalledModel;

    #[async_trait]
    impl GenerativeModel for StalledModel {
        async fn generate(&self, _request: GenerationRequest) -> Result<Option<String>, ModelError> {
            std::future::pending().await
        }
    }

    fn text_request(form: FormType) -> ExtractionRequest {
        ExtractionRequest::new(
            ExtractionInput::Text("Пациентка Иванова, 34 года, жалобы на кашель.".to_string()),
            form,
            LanguageHint::Russian,
        )
    }

    #[tokio::test]
    async fn test_missing_credential_skips_network() {
        let gateway = ExtractionGateway::new(None);
        let result = gateway
            .extract(&text_request(FormType::Form075), &CancellationToken::new())
            .await;
        assert_eq!(result, Err(ExtractionFailure::MissingCredential));
    }

    #[tokio::test]
    async fn test_success_parses_record() {
        let model = ScriptedModel::replying(vec![Ok(Some(
            r#"{"patientName":"Иванова Анна","gender":"female","workPlace":"","shortSummary":"Острый бронхит."}"#
                .to_string(),
        ))]);
        let gateway = ExtractionGateway::new(Some(model.clone()));

        let record = gateway
            .extract(&text_request(FormType::Form075), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.text(fields::PATIENT_NAME), "Иванова Анна");
        assert_eq!(record.text(fields::WORK_PLACE), "");
        assert_eq!(record.summary(), "Острый бронхит.");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_carries_prompt_schema_and_audio() {
        let model = ScriptedModel::replying(vec![Ok(Some(r#"{"shortSummary":"S"}"#.to_string()))]);
        let gateway = ExtractionGateway::new(Some(model.clone()));
        let clip = AudioClip::new("audio/webm", vec![1u8, 2, 3]);
        let request = ExtractionRequest::new(
            ExtractionInput::Audio(clip.clone()),
            FormType::Form003,
            LanguageHint::Auto,
        );

        gateway.extract(&request, &CancellationToken::new()).await.unwrap();

        let sent = model.requests.lock().unwrap();
        let sent = &sent[0];
        assert!((sent.temperature - EXTRACTION_TEMPERATURE).abs() < f32::EPSILON);
        assert!(matches!(&sent.parts[0], Part::InlineData { mime_type, data } if mime_type == "audio/webm" && data.len() == 3));
        // The clip's buffer is shared with the request, not copied
        assert!(matches!(&sent.parts[0], Part::InlineData { data, .. } if Arc::ptr_eq(data, &clip.shared_bytes())));
        assert!(matches!(&sent.parts[1], Part::Text(prompt) if prompt.contains("003/у")));
        let schema = sent.response_schema.as_ref().unwrap();
        assert_eq!(schema["properties"]["emergency"]["type"], "BOOLEAN");
    }

    #[tokio::test]
    async fn test_empty_reply_is_no_response() {
        for reply in [None, Some("   ".to_string())] {
            let gateway = ExtractionGateway::new(Some(ScriptedModel::replying(vec![Ok(reply)])));
            let result = gateway
                .extract(&text_request(FormType::Form027), &CancellationToken::new())
                .await;
            assert_eq!(result, Err(ExtractionFailure::NoResponse));
        }
    }

    #[tokio::test]
    async fn test_malformed_and_failing_replies_are_transient() {
        let replies = vec![
            Ok(Some("not json".to_string())),
            Ok(Some(r#"{"patientName":"A"}"#.to_string())),
            Ok(Some(r#"{"gender":"robot","shortSummary":"S"}"#.to_string())),
            Err(ModelError::Api {
                status: 500,
                message: "internal".to_string(),
            }),
            Err(ModelError::Http("connection reset".to_string())),
        ];
        let count = replies.len();
        let gateway = ExtractionGateway::new(Some(ScriptedModel::replying(replies)));

        for _ in 0..count {
            let result = gateway
                .extract(&text_request(FormType::Form075), &CancellationToken::new())
                .await;
            assert!(matches!(result, Err(ExtractionFailure::Transient(_))), "{result:?}");
        }
    }

    #[tokio::test]
    async fn test_cancellation_abandons_pending_call() {
        let gateway = ExtractionGateway::new(Some(Arc::new(StalledModel)));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = gateway.extract(&text_request(FormType::Form075), &token).await;
        assert_eq!(result, Err(ExtractionFailure::Cancelled));
    }

    #[test]
    fn test_resolver_without_credential_builds_unconfigured_gateway() {
        let factory: ModelFactory =
            Arc::new(|_: &Credential| ScriptedModel::replying(vec![]) as Arc<dyn GenerativeModel>);
        let resolver = CredentialResolver::new(vec!["MEDSCRIBE_TEST_UNSET_KEY".to_string()]);
        assert!(!ExtractionGateway::from_resolver(&resolver, &factory).is_configured());

        let resolver = resolver.with_override("manual");
        assert!(ExtractionGateway::from_resolver(&resolver, &factory).is_configured());
    }
}
