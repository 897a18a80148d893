//! Editable document model
//!
//! A `DocumentRecord` is the live instance of an extraction for one form
//! type. It always carries every field of that form's schema, so consumers
//! never have to distinguish "absent" from "empty".

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::error::DocumentError;
use crate::form::FormType;
use crate::schema::{FieldKind, FieldSpec, fields};

/// Label used when the patient name was not captured
pub const UNKNOWN_PATIENT: &str = "Unknown Patient";

/// Value of a single form field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
}

impl FieldValue {
    /// Empty value for a field kind
    pub fn empty(kind: FieldKind) -> Self {
        if kind.is_boolean() {
            FieldValue::Bool(false)
        } else {
            FieldValue::Text(String::new())
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(flag) => Some(*flag),
            FieldValue::Text(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Bool(_) => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<bool> for FieldValue {
    fn from(flag: bool) -> Self {
        FieldValue::Bool(flag)
    }
}

/// Outcome of validating raw model output
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub record: DocumentRecord,
    /// Keys present in the model output that the schema does not declare
    pub ignored: Vec<String>,
}

/// User-editable document for one form type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub form_type: FormType,
    fields: BTreeMap<String, FieldValue>,
}

impl DocumentRecord {
    /// A record with every schema field set to its empty value
    pub fn empty(form_type: FormType) -> Self {
        let fields = form_type
            .schema()
            .fields
            .iter()
            .map(|spec| (spec.name.to_string(), FieldValue::empty(spec.kind)))
            .collect();
        Self { form_type, fields }
    }

    /// Parse the raw JSON text returned by the model
    pub fn from_model_output(form_type: FormType, raw: &str) -> Result<ParsedRecord, DocumentError> {
        let value: JsonValue = serde_json::from_str(raw.trim())
            .map_err(|e| DocumentError::SchemaViolation(format!("invalid JSON: {}", e)))?;
        Self::from_json(form_type, &value)
    }

    /// Validate a JSON object against the form schema.
    ///
    /// Unknown keys are dropped and reported, missing fields take their
    /// empty value, wrong types and out-of-range enum tokens are rejected.
    /// `shortSummary` must be present and non-empty.
    pub fn from_json(form_type: FormType, value: &JsonValue) -> Result<ParsedRecord, DocumentError> {
        let object = value.as_object().ok_or_else(|| {
            DocumentError::SchemaViolation("top-level value is not an object".to_string())
        })?;
        let schema = form_type.schema();

        let mut record = Self::empty(form_type);
        for spec in schema.fields {
            if let Some(raw) = object.get(spec.name) {
                let parsed = coerce_model_value(spec, raw)?;
                record.fields.insert(spec.name.to_string(), parsed);
            }
        }

        if record.text(fields::SHORT_SUMMARY).trim().is_empty() {
            return Err(DocumentError::SchemaViolation(
                "shortSummary is missing or empty".to_string(),
            ));
        }

        let mut ignored: Vec<String> = object
            .keys()
            .filter(|key| !schema.contains(key))
            .cloned()
            .collect();
        ignored.sort();

        Ok(ParsedRecord { record, ignored })
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text value of a field, empty for unknown or boolean fields
    pub fn text(&self, name: &str) -> &str {
        self.fields
            .get(name)
            .and_then(FieldValue::as_text)
            .unwrap_or("")
    }

    /// Boolean value of a field, false for unknown or text fields
    pub fn flag(&self, name: &str) -> bool {
        self.fields
            .get(name)
            .and_then(FieldValue::as_bool)
            .unwrap_or(false)
    }

    pub fn is_blank(&self, name: &str) -> bool {
        self.fields.get(name).is_none_or(FieldValue::is_blank)
    }

    pub fn summary(&self) -> &str {
        self.text(fields::SHORT_SUMMARY)
    }

    /// Human-readable label for history listings and file names
    pub fn patient_label(&self) -> &str {
        let name = self.text(fields::PATIENT_NAME).trim();
        if name.is_empty() { UNKNOWN_PATIENT } else { name }
    }

    /// Fields in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> + '_ {
        self.form_type
            .schema()
            .fields
            .iter()
            .filter_map(|spec| self.fields.get(spec.name).map(|value| (spec.name, value)))
    }

    /// Replace exactly one field, keeping all others.
    ///
    /// The value must match the field's kind. Free text accepts any
    /// string including empty; enumerated kinds accept one of their
    /// tokens or empty.
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), DocumentError> {
        let spec = self.form_type.schema().field(name).ok_or_else(|| {
            DocumentError::UnknownField {
                form: self.form_type.to_string(),
                field: name.to_string(),
            }
        })?;
        check_kind(spec, &value)?;
        self.fields.insert(spec.name.to_string(), value);
        Ok(())
    }

    /// Copying variant of [`DocumentRecord::set_field`]
    pub fn with_field(&self, name: &str, value: FieldValue) -> Result<Self, DocumentError> {
        let mut next = self.clone();
        next.set_field(name, value)?;
        Ok(next)
    }

    /// Flat `field -> value` JSON object, as consumed by templates and clients
    pub fn to_json(&self) -> JsonValue {
        let map = self
            .fields
            .iter()
            .map(|(name, value)| {
                let json = match value {
                    FieldValue::Text(text) => JsonValue::String(text.clone()),
                    FieldValue::Bool(flag) => JsonValue::Bool(*flag),
                };
                (name.clone(), json)
            })
            .collect();
        JsonValue::Object(map)
    }
}

fn check_kind(spec: &FieldSpec, value: &FieldValue) -> Result<(), DocumentError> {
    match (spec.kind, value) {
        (FieldKind::Boolean, FieldValue::Bool(_)) | (FieldKind::Text, FieldValue::Text(_)) => Ok(()),
        (kind, FieldValue::Text(text)) if kind.allowed_values().is_some() => {
            let allowed = kind.allowed_values().unwrap_or_default();
            if text.is_empty() || allowed.contains(&text.as_str()) {
                Ok(())
            } else {
                Err(DocumentError::InvalidChoice {
                    field: spec.name.to_string(),
                    value: text.clone(),
                })
            }
        }
        (expected, _) => Err(DocumentError::TypeMismatch {
            field: spec.name.to_string(),
            expected,
        }),
    }
}

/// Convert one raw model value into a typed field value
fn coerce_model_value(spec: &FieldSpec, raw: &JsonValue) -> Result<FieldValue, DocumentError> {
    let value = match (spec.kind, raw) {
        (kind, JsonValue::Null) => FieldValue::empty(kind),
        (FieldKind::Boolean, JsonValue::Bool(flag)) => FieldValue::Bool(*flag),
        (FieldKind::Text, JsonValue::String(text)) => FieldValue::Text(text.trim().to_string()),
        (FieldKind::Gender | FieldKind::Transport, JsonValue::String(text)) => {
            FieldValue::Text(text.trim().to_lowercase())
        }
        (kind, other) => {
            return Err(DocumentError::SchemaViolation(format!(
                "field {} expects {:?}, got {}",
                spec.name, kind, other
            )));
        }
    };
    check_kind(spec, &value).map_err(|e| DocumentError::SchemaViolation(e.to_string()))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(form: FormType, value: JsonValue) -> Result<ParsedRecord, DocumentError> {
        DocumentRecord::from_json(form, &value)
    }

    #[test]
    fn test_empty_record_has_every_field() {
        let record = DocumentRecord::empty(FormType::Form003);
        assert_eq!(record.iter().count(), FormType::Form003.schema().fields.len());
        assert_eq!(record.get(fields::EMERGENCY), Some(&FieldValue::Bool(false)));
        assert_eq!(record.text(fields::PATIENT_NAME), "");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let parsed = parse(
            FormType::Form075,
            json!({"patientName": "Иванов Иван", "shortSummary": "Пациент здоров."}),
        )
        .unwrap();

        assert_eq!(parsed.record.text(fields::WORK_PLACE), "");
        assert_eq!(parsed.record.text(fields::GENDER), "");
        assert_eq!(parsed.record.patient_label(), "Иванов Иван");
        assert!(parsed.ignored.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_dropped_and_reported() {
        let parsed = parse(
            FormType::Form027,
            json!({"patientName": "A", "shortSummary": "S", "bloodType": "II", "extra": 1}),
        )
        .unwrap();

        assert!(parsed.record.get("bloodType").is_none());
        assert_eq!(parsed.ignored, vec!["bloodType".to_string(), "extra".to_string()]);
    }

    #[test]
    fn test_rejects_invalid_json_and_non_objects() {
        assert!(matches!(
            DocumentRecord::from_model_output(FormType::Form075, "{not json"),
            Err(DocumentError::SchemaViolation(_))
        ));
        assert!(parse(FormType::Form075, json!(["a"])).is_err());
    }

    #[test]
    fn test_rejects_wrong_types_and_bad_enums() {
        assert!(parse(FormType::Form075, json!({"shortSummary": "S", "iin": 123})).is_err());
        assert!(parse(FormType::Form075, json!({"shortSummary": "S", "gender": "other"})).is_err());
        assert!(parse(FormType::Form003, json!({"shortSummary": "S", "emergency": "yes"})).is_err());
    }

    #[test]
    fn test_requires_summary() {
        assert!(parse(FormType::Form075, json!({"patientName": "A"})).is_err());
        assert!(parse(FormType::Form075, json!({"patientName": "A", "shortSummary": "  "})).is_err());
    }

    #[test]
    fn test_normalizes_enum_tokens_and_nulls() {
        let parsed = parse(
            FormType::Form003,
            json!({
                "shortSummary": "S",
                "gender": " Female ",
                "transportType": "STRETCHER",
                "emergency": true,
                "ward": null
            }),
        )
        .unwrap();

        assert_eq!(parsed.record.text(fields::GENDER), "female");
        assert_eq!(parsed.record.text(fields::TRANSPORT_TYPE), "stretcher");
        assert!(parsed.record.flag(fields::EMERGENCY));
        assert_eq!(parsed.record.text("ward"), "");
    }

    #[test]
    fn test_set_field_replaces_exactly_one_field() {
        let record = parse(
            FormType::Form075,
            json!({"patientName": "A", "workPlace": "Школа №5", "shortSummary": "S"}),
        )
        .unwrap()
        .record;

        let edited = record.with_field(fields::PATIENT_NAME, "Б".into()).unwrap();
        assert_eq!(edited.text(fields::PATIENT_NAME), "Б");
        for (name, value) in record.iter().filter(|(name, _)| *name != fields::PATIENT_NAME) {
            assert_eq!(edited.get(name), Some(value), "{name} changed");
        }

        let cleared = edited.with_field(fields::WORK_PLACE, "".into()).unwrap();
        assert_eq!(cleared.text(fields::WORK_PLACE), "");
    }

    #[test]
    fn test_set_field_checks_kind() {
        let mut record = DocumentRecord::empty(FormType::Form003);
        record.set_field(fields::EMERGENCY, true.into()).unwrap();
        record.set_field(fields::GENDER, "male".into()).unwrap();
        record.set_field(fields::TRANSPORT_TYPE, "".into()).unwrap();

        assert!(matches!(
            record.set_field(fields::EMERGENCY, "yes".into()),
            Err(DocumentError::TypeMismatch { .. })
        ));
        assert!(matches!(
            record.set_field(fields::GENDER, "unknown".into()),
            Err(DocumentError::InvalidChoice { .. })
        ));
        assert!(matches!(
            record.set_field("iin", "1".into()),
            Err(DocumentError::UnknownField { .. })
        ));
        assert!(record.flag(fields::EMERGENCY));
    }

    #[test]
    fn test_patient_label_fallback() {
        let record = DocumentRecord::empty(FormType::Form027);
        assert_eq!(record.patient_label(), UNKNOWN_PATIENT);
    }

    #[test]
    fn test_serde_roundtrip_keeps_booleans() {
        let mut record = DocumentRecord::empty(FormType::Form003);
        record.set_field(fields::EMERGENCY, true.into()).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["formType"], "003");
        assert_eq!(json["fields"]["emergency"], true);

        let back: DocumentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
