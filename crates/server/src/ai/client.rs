//! Gemini API client for the `generateContent` endpoint

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AiConfig;

/// Upper bound for a single generation call (long consultations take a while)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Errors talking to the generative model
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),
}

/// One piece of request content
#[derive(Debug, Clone)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: Arc<[u8]> },
}

/// A single-turn generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub parts: Vec<Part>,
    /// Structured-output schema; `None` asks for plain text
    pub response_schema: Option<JsonValue>,
    pub temperature: f32,
}

/// Anything that can turn a request into reply text.
///
/// `Ok(None)` means the service answered without any text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<Option<String>, ModelError>;
}

/// Client for the Google Gemini API
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Request body for generateContent
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct ApiContent {
    role: &'static str,
    parts: Vec<ApiPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ApiPart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<JsonValue>,
}

/// Response from generateContent
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Error detail from the API
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GeminiClient {
    /// Create a new client with the given API key
    pub fn new(api_key: String, config: &AiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl From<GenerationRequest> for ApiRequest {
    fn from(request: GenerationRequest) -> Self {
        let parts = request
            .parts
            .into_iter()
            .map(|part| match part {
                Part::Text(text) => ApiPart::Text { text },
                Part::InlineData { mime_type, data } => ApiPart::Inline {
                    inline_data: InlineData {
                        mime_type,
                        data: BASE64.encode(&data),
                    },
                },
            })
            .collect();

        let structured = request.response_schema.is_some();
        ApiRequest {
            contents: vec![ApiContent {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                response_mime_type: structured.then_some("application/json"),
                response_schema: request.response_schema,
            },
        }
    }
}

impl ApiResponse {
    /// Concatenated text of the first candidate, `None` when there is none
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() { None } else { Some(text) }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<Option<String>, ModelError> {
        let body = ApiRequest::from(request);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|api_err| api_err.error.message)
                .unwrap_or(body);
            return Err(ModelError::Api { status, message });
        }

        let parsed = response
            .json::<ApiResponse>()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;

        Ok(parsed.into_text())
    }
}
