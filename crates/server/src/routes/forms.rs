//! Form catalogue endpoints

use axum::{Json, extract::Path};
use medscribe_core::{FieldSpec, FormType};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::AppError;

/// Summary of one supported form
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    form_type: FormType,
    code: &'static str,
    title: &'static str,
    fields: Vec<&'static str>,
}

/// Full field schema of one form
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchemaResponse {
    form_type: FormType,
    code: &'static str,
    title: &'static str,
    fields: &'static [FieldSpec],
    /// Structured-output schema exactly as sent to the model
    response_schema: JsonValue,
}

/// GET /forms - List the supported forms
pub async fn list() -> Json<Vec<FormSummary>> {
    let forms = FormType::ALL
        .into_iter()
        .map(|form| {
            let descriptor = form.descriptor();
            FormSummary {
                form_type: form,
                code: descriptor.code,
                title: descriptor.title,
                fields: form.schema().field_names().collect(),
            }
        })
        .collect();
    Json(forms)
}

/// GET /forms/{form}/schema - Field definitions for a form
pub async fn schema(Path(form): Path<String>) -> Result<Json<FormSchemaResponse>, AppError> {
    let form: FormType = form.parse()?;
    let descriptor = form.descriptor();
    let schema = form.schema();

    Ok(Json(FormSchemaResponse {
        form_type: form,
        code: descriptor.code,
        title: descriptor.title,
        fields: schema.fields,
        response_schema: schema.response_schema(),
    }))
}
