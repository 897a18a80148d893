//! Signed-in clinician identity and post-extraction enrichment

use serde::{Deserialize, Serialize};

use crate::record::{DocumentRecord, FieldValue};
use crate::schema::fields;

/// Clinician identity supplied by the host application
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
}

impl UserIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_license(mut self, license_id: impl Into<String>) -> Self {
        self.license_id = Some(license_id.into());
        self
    }

    /// Signature line written into `doctorName`: `<name>, ID: <licenseId>`
    pub fn signature(&self) -> Option<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        match non_blank(&self.license_id) {
            Some(license) => Some(format!("{}, ID: {}", name, license)),
            None => Some(name.to_string()),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Fill facility and doctor fields from the identity where the record left them empty.
///
/// Values already present, whether extracted or typed by the user, are never
/// overwritten, which also makes repeated merges a no-op.
pub fn merge(record: &DocumentRecord, identity: &UserIdentity) -> DocumentRecord {
    let mut merged = record.clone();

    if merged.is_blank(fields::HEALTHCARE_FACILITY) {
        if let Some(organization) = non_blank(&identity.organization) {
            fill(&mut merged, fields::HEALTHCARE_FACILITY, organization.to_string());
        }
    }

    if merged.is_blank(fields::DOCTOR_NAME) {
        if let Some(signature) = identity.signature() {
            fill(&mut merged, fields::DOCTOR_NAME, signature);
        }
    }

    merged
}

fn fill(record: &mut DocumentRecord, field: &str, value: String) {
    // Every form declares both identity fields as free text
    if let Err(e) = record.set_field(field, FieldValue::Text(value)) {
        tracing::warn!(field, error = %e, "Identity field not applicable to form");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormType;

    fn aliyeva() -> UserIdentity {
        UserIdentity::new("Dr. Aliyeva")
            .with_organization("Городская поликлиника №1")
            .with_license("KZ-001")
    }

    #[test]
    fn test_fills_empty_doctor_with_license_suffix() {
        let record = DocumentRecord::empty(FormType::Form075);
        let merged = merge(&record, &aliyeva());

        assert_eq!(merged.text(fields::DOCTOR_NAME), "Dr. Aliyeva, ID: KZ-001");
        assert_eq!(
            merged.text(fields::HEALTHCARE_FACILITY),
            "Городская поликлиника №1"
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        for form in FormType::ALL {
            let once = merge(&DocumentRecord::empty(form), &aliyeva());
            let twice = merge(&once, &aliyeva());
            assert_eq!(once, twice, "{form}");
            assert_eq!(twice.text(fields::DOCTOR_NAME), "Dr. Aliyeva, ID: KZ-001");
        }
    }

    #[test]
    fn test_never_overwrites_existing_values() {
        let record = DocumentRecord::empty(FormType::Form027)
            .with_field(fields::DOCTOR_NAME, "Сейткали А.Б.".into())
            .unwrap()
            .with_field(fields::HEALTHCARE_FACILITY, "ГКП на ПХВ".into())
            .unwrap();

        let merged = merge(&record, &aliyeva());
        assert_eq!(merged, record);
    }

    #[test]
    fn test_whitespace_counts_as_empty() {
        let record = DocumentRecord::empty(FormType::Form003)
            .with_field(fields::DOCTOR_NAME, "   ".into())
            .unwrap();

        let merged = merge(&record, &aliyeva());
        assert_eq!(merged.text(fields::DOCTOR_NAME), "Dr. Aliyeva, ID: KZ-001");
    }

    #[test]
    fn test_missing_license_and_organization() {
        let identity = UserIdentity::new("Dr. Aliyeva");
        let merged = merge(&DocumentRecord::empty(FormType::Form075), &identity);

        assert_eq!(merged.text(fields::DOCTOR_NAME), "Dr. Aliyeva");
        assert_eq!(merged.text(fields::HEALTHCARE_FACILITY), "");
    }

    #[test]
    fn test_blank_identity_changes_nothing() {
        let record = DocumentRecord::empty(FormType::Form075);
        assert_eq!(merge(&record, &UserIdentity::default()), record);
    }

    #[test]
    fn test_other_fields_untouched() {
        let record = DocumentRecord::empty(FormType::Form075)
            .with_field(fields::PATIENT_NAME, "Иванов".into())
            .unwrap();
        let merged = merge(&record, &aliyeva());

        assert_eq!(merged.text(fields::PATIENT_NAME), "Иванов");
        assert_eq!(merged.text(fields::WORK_PLACE), "");
    }
}
