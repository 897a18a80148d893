//! Form schema registry
//!
//! Declares, per form type, the ordered set of fields the model may return,
//! their semantic kind and which of them are mandatory. Field names are the
//! stable identifiers shared by prompts, model responses, the editable
//! document and the export templates.

use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use crate::form::FormType;

/// Field names referenced outside the schema tables
pub mod fields {
    pub const HEALTHCARE_FACILITY: &str = "healthcareFacility";
    pub const PATIENT_NAME: &str = "patientName";
    pub const DOCTOR_NAME: &str = "doctorName";
    pub const GENDER: &str = "gender";
    pub const AGE: &str = "age";
    pub const WORK_PLACE: &str = "workPlace";
    pub const TRANSPORT_TYPE: &str = "transportType";
    pub const EMERGENCY: &str = "emergency";
    pub const SHORT_SUMMARY: &str = "shortSummary";
}

pub const GENDER_VALUES: &[&str] = &["male", "female"];
pub const TRANSPORT_VALUES: &[&str] = &["walking", "stretcher", "wheelchair"];

/// Semantic type of a form field
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Gender,
    Transport,
    Boolean,
}

impl FieldKind {
    /// Allowed tokens for enumerated kinds
    pub fn allowed_values(self) -> Option<&'static [&'static str]> {
        match self {
            FieldKind::Gender => Some(GENDER_VALUES),
            FieldKind::Transport => Some(TRANSPORT_VALUES),
            FieldKind::Text | FieldKind::Boolean => None,
        }
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, FieldKind::Boolean)
    }
}

/// A single extractable field
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Description sent to the model alongside the field
    pub description: &'static str,
}

impl FieldSpec {
    const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            required: false,
            description,
        }
    }

    const fn of(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// JSON schema fragment for this field in the model's structured-output format
    fn response_property(&self) -> JsonValue {
        let mut property = serde_json::Map::new();
        let type_name = if self.kind.is_boolean() {
            "BOOLEAN"
        } else {
            "STRING"
        };
        property.insert("type".to_string(), json!(type_name));
        property.insert("description".to_string(), json!(self.description));
        if let Some(values) = self.kind.allowed_values() {
            property.insert("enum".to_string(), json!(values));
        }
        JsonValue::Object(property)
    }
}

/// Ordered field set for one form type
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub form_type: FormType,
    pub fields: &'static [FieldSpec],
}

impl FieldSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|spec| spec.required)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|spec| spec.name)
    }

    /// Structured-output schema requested from the generative model.
    ///
    /// An OBJECT whose properties mirror the field set in order, with
    /// `enum` constraints for enumerated kinds and a `required` list.
    pub fn response_schema(&self) -> JsonValue {
        let mut properties = serde_json::Map::new();
        for spec in self.fields {
            properties.insert(spec.name.to_string(), spec.response_property());
        }
        let required: Vec<&str> = self.required_fields().map(|spec| spec.name).collect();
        let ordering: Vec<&str> = self.field_names().collect();

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
            "propertyOrdering": ordering,
        })
    }
}

/// Look up the schema for a form type
pub fn schema_for(form_type: FormType) -> &'static FieldSchema {
    match form_type {
        FormType::Form075 => &SCHEMA_075,
        FormType::Form027 => &SCHEMA_027,
        FormType::Form003 => &SCHEMA_003,
    }
}

const SUMMARY: FieldSpec = FieldSpec::text(
    fields::SHORT_SUMMARY,
    "Краткое клиническое резюме консультации в одном предложении",
)
.required();

static SCHEMA_075: FieldSchema = FieldSchema {
    form_type: FormType::Form075,
    fields: &[
        FieldSpec::text(fields::HEALTHCARE_FACILITY, "Название медицинской организации"),
        FieldSpec::text("iin", "ИИН пациента"),
        FieldSpec::text(fields::PATIENT_NAME, "ФИО пациента").required(),
        FieldSpec::text("dateOfBirth", "Дата рождения (DD.MM.YYYY)"),
        FieldSpec::of(fields::GENDER, FieldKind::Gender, "Пол (male/female)").required(),
        FieldSpec::text("livingAddress", "Адрес проживания"),
        FieldSpec::text("registrationAddress", "Адрес регистрации"),
        FieldSpec::text(fields::WORK_PLACE, "Место работы или учебы"),
        FieldSpec::text("position", "Должность"),
        FieldSpec::text("lastCheckupDate", "Дата последнего медосмотра"),
        FieldSpec::text(
            "pastIllnesses",
            "Заболевания, выявленные с момента последнего медосмотра",
        ),
        FieldSpec::text(fields::DOCTOR_NAME, "ФИО врача"),
        FieldSpec::text(
            "conclusion",
            "Заключение терапевта (Здоров / Годен к работе/учебе)",
        ),
        SUMMARY,
    ],
};

static SCHEMA_027: FieldSchema = FieldSchema {
    form_type: FormType::Form027,
    fields: &[
        FieldSpec::text(fields::HEALTHCARE_FACILITY, "Название медицинской организации"),
        FieldSpec::text("date", "Дата выдачи выписки"),
        FieldSpec::text(fields::PATIENT_NAME, "ФИО пациента").required(),
        FieldSpec::text("dateOfBirth", "Дата рождения (DD.MM.YYYY)"),
        FieldSpec::text("address", "Адрес проживания"),
        FieldSpec::text(fields::WORK_PLACE, "Место работы или учебы"),
        FieldSpec::text("diagnosis", "Полный диагноз"),
        FieldSpec::text("conclusion", "Проведенное лечение (заключение)"),
        FieldSpec::text("recommendations", "Лечебно-трудовые рекомендации"),
        FieldSpec::text(fields::DOCTOR_NAME, "ФИО врача"),
        SUMMARY,
    ],
};

static SCHEMA_003: FieldSchema = FieldSchema {
    form_type: FormType::Form003,
    fields: &[
        FieldSpec::text(fields::HEALTHCARE_FACILITY, "Название медицинской организации"),
        FieldSpec::text("admissionDate", "Дата и время поступления"),
        FieldSpec::text("dischargeDate", "Дата и время выписки"),
        FieldSpec::text("department", "Отделение"),
        FieldSpec::text("ward", "Номер палаты"),
        FieldSpec::text("daysSpent", "Проведено койко-дней"),
        FieldSpec::of(
            fields::TRANSPORT_TYPE,
            FieldKind::Transport,
            "Вид транспортировки (walking/stretcher/wheelchair)",
        ),
        FieldSpec::text("bloodType", "Группа крови"),
        FieldSpec::text("rhFactor", "Резус-фактор"),
        FieldSpec::text("sideEffects", "Побочное действие лекарств"),
        FieldSpec::text(fields::PATIENT_NAME, "ФИО пациента").required(),
        FieldSpec::of(fields::GENDER, FieldKind::Gender, "Пол (male/female)").required(),
        FieldSpec::text(fields::AGE, "Дата рождения или возраст").required(),
        FieldSpec::text("address", "Место жительства"),
        FieldSpec::text(fields::WORK_PLACE, "Место работы"),
        FieldSpec::text("referredBy", "Кем направлен"),
        FieldSpec::of(
            fields::EMERGENCY,
            FieldKind::Boolean,
            "Доставлен по экстренным показаниям",
        ),
        FieldSpec::text("referralDiagnosis", "Диагноз направившей организации"),
        FieldSpec::text("clinicalDiagnosis", "Диагноз клинический"),
        FieldSpec::text("diagnosisDate", "Дата установления диагноза"),
        FieldSpec::text(fields::DOCTOR_NAME, "ФИО врача"),
        SUMMARY,
    ],
};
