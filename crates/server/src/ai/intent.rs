//! Form-type intent detection
//!
//! Best effort: a failed or unclear classification yields `None` and the
//! caller keeps its current form.

use medscribe_core::FormType;
use medscribe_core::intent::{classifier_prompt, match_form_reference, parse_classifier_reply};

use super::client::{GenerationRequest, Part};
use super::extraction::{ExtractionGateway, ExtractionInput};

impl ExtractionGateway {
    /// Detect an explicit request to fill out a specific form.
    ///
    /// Text is matched lexically first and only falls back to the model when
    /// nothing matched. Audio always goes to the model. A model that does not
    /// answer within the intent timeout counts as no request.
    pub async fn classify_form_intent(&self, input: &ExtractionInput) -> Option<FormType> {
        if let ExtractionInput::Text(text) = input {
            if let Some(form) = match_form_reference(text) {
                tracing::debug!(form = form.numeral(), "Form intent matched lexically");
                return Some(form);
            }
        }

        let model = self.model()?;
        let mut parts = Vec::with_capacity(2);
        match input {
            ExtractionInput::Audio(clip) => parts.push(Part::InlineData {
                mime_type: clip.mime_type.clone(),
                data: clip.shared_bytes(),
            }),
            ExtractionInput::Text(text) => parts.push(Part::Text(format!("Text: \"{text}\""))),
        }
        parts.push(Part::Text(classifier_prompt()));

        let request = GenerationRequest {
            parts,
            response_schema: None,
            temperature: 0.0,
        };

        let reply = match tokio::time::timeout(self.intent_timeout(), model.generate(request)).await {
            Ok(reply) => reply,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.intent_timeout().as_millis() as u64,
                    "Form intent classification timed out"
                );
                return None;
            }
        };

        match reply {
            Ok(Some(reply)) => {
                let form = parse_classifier_reply(&reply);
                tracing::debug!(form = ?form, "Form intent classified by model");
                form
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Form intent classification failed");
                None
            }
        }
    }
}
