//! Word download and print view

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header},
    response::{Html, IntoResponse},
};
use medscribe_core::export::{
    EXPORT_CONTENT_TYPE, export_filename, render_document, render_print_view,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// GET /sessions/{id}/export - Download the active document as `.doc`
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.sessions.document(id)?;
    let body = render_document(&record)?;
    let filename = export_filename(&record);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(EXPORT_CONTENT_TYPE),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&filename))
            .map_err(|e| AppError::Internal(format!("Invalid export filename: {}", e)))?,
    );

    tracing::info!(session = %id, form = record.form_type.numeral(), "Document exported");
    Ok((headers, body))
}

/// GET /sessions/{id}/print - Printable view that opens the print dialog
pub async fn print(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let record = state.sessions.document(id)?;
    Ok(Html(render_print_view(&record)?))
}

/// `attachment` header with an ASCII fallback and the UTF-8 name (RFC 6266)
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        percent_encode(filename)
    )
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_keeps_ascii_and_encodes_utf8() {
        let header = content_disposition("MedScribe_Form_075_Иван.doc");
        assert!(header.starts_with("attachment; filename=\"MedScribe_Form_075_____.doc\""));
        assert!(header.ends_with("filename*=UTF-8''MedScribe_Form_075_%D0%98%D0%B2%D0%B0%D0%BD.doc"));
        assert!(HeaderValue::from_str(&header).is_ok());
    }

    #[test]
    fn test_spaces_are_encoded() {
        assert_eq!(percent_encode("a b"), "a%20b");
    }
}
