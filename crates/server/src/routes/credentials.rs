//! Manual API key entry

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::ai::CredentialOrigin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCredential {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

/// POST /credentials - Use a manually supplied key for all new generations
pub async fn set(
    State(state): State<AppState>,
    Json(body): Json<SetCredential>,
) -> Json<CredentialStatus> {
    let origin = state.set_credential(&body.api_key);
    let source = origin.map(|origin| match origin {
        CredentialOrigin::Manual => "manual".to_string(),
        CredentialOrigin::Environment(name) => name,
    });

    tracing::info!(target: "audit", source = ?source, "Generative model credential updated");
    Json(CredentialStatus {
        configured: source.is_some(),
        source,
    })
}
