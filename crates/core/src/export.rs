//! Word-compatible export of a document record
//!
//! Each form has a Tera template reproducing the official layout. The
//! output is a self-contained HTML document that word processors open as
//! `.doc`; the print view is the same markup with a print hook.

use std::sync::OnceLock;
use tera::{Context, Tera};

use crate::error::ExportError;
use crate::record::DocumentRecord;

/// MIME type announced for the `.doc` download
pub const EXPORT_CONTENT_TYPE: &str = "application/vnd.ms-word; charset=utf-8";

const TEMPLATES: &[(&str, &str)] = &[
    ("document.html", include_str!("../templates/document.html")),
    ("form_075.html", include_str!("../templates/form_075.html")),
    ("form_027.html", include_str!("../templates/form_027.html")),
    ("form_003.html", include_str!("../templates/form_003.html")),
];

fn engine() -> Result<&'static Tera, ExportError> {
    static ENGINE: OnceLock<Tera> = OnceLock::new();
    if let Some(tera) = ENGINE.get() {
        return Ok(tera);
    }
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())?;
    Ok(ENGINE.get_or_init(|| tera))
}

/// Render the downloadable document
pub fn render_document(record: &DocumentRecord) -> Result<String, ExportError> {
    render(record, false)
}

/// Render the document with a hook that opens the host's print dialog
pub fn render_print_view(record: &DocumentRecord) -> Result<String, ExportError> {
    render(record, true)
}

fn render(record: &DocumentRecord, print: bool) -> Result<String, ExportError> {
    let descriptor = record.form_type.descriptor();

    // Records restored from older history snapshots may lack fields
    let mut values = DocumentRecord::empty(record.form_type).to_json();
    if let (Some(base), serde_json::Value::Object(current)) = (values.as_object_mut(), record.to_json()) {
        base.extend(current);
    }

    let mut context = Context::from_value(values)?;
    context.insert("form_code", descriptor.code);
    context.insert("form_title", descriptor.title);
    context.insert("print", &print);

    let rendered = engine()?.render(descriptor.template, &context)?;
    Ok(rendered)
}

/// Download file name: `MedScribe_Form_<form>_<patient>.doc`
pub fn export_filename(record: &DocumentRecord) -> String {
    let patient = record.text(crate::schema::fields::PATIENT_NAME).trim();
    let patient = if patient.is_empty() { "Doc" } else { patient };
    let safe: String = patient
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("MedScribe_Form_{}_{}.doc", record.form_type.numeral(), safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormType;
    use crate::schema::fields;

    fn filled(form: FormType) -> DocumentRecord {
        DocumentRecord::empty(form)
            .with_field(fields::PATIENT_NAME, "Иванов Иван".into())
            .unwrap()
            .with_field(fields::DOCTOR_NAME, "Dr. Aliyeva, ID: KZ-001".into())
            .unwrap()
    }

    #[test]
    fn test_each_form_renders_its_boilerplate() {
        for form in FormType::ALL {
            let html = render_document(&filled(form)).unwrap();
            assert!(html.contains(&format!("Форма № {}", form.code())), "{form}");
            assert!(html.contains("ҚР ДСМ-175/2020"), "{form}");
            assert!(html.contains("Иванов Иван"), "{form}");
            assert!(html.contains("Dr. Aliyeva, ID: KZ-001"), "{form}");
            assert!(!html.contains("window.print"), "{form}");
        }
    }

    #[test]
    fn test_form_specific_labels() {
        let html = render_document(&filled(FormType::Form027)).unwrap();
        assert!(html.contains("7. Полный диагноз:"));
        assert!(html.contains("ВЫПИСКА ИЗ МЕДИЦИНСКОЙ КАРТЫ"));

        let html = render_document(&filled(FormType::Form003)).unwrap();
        assert!(html.contains("МЕДИЦИНСКАЯ КАРТА"));
        assert!(html.contains("14. Доставлен по экстренным показаниям"));
    }

    #[test]
    fn test_checkboxes_reflect_values() {
        let record = filled(FormType::Form003)
            .with_field(fields::GENDER, "female".into())
            .unwrap()
            .with_field(fields::EMERGENCY, true.into())
            .unwrap();
        let html = render_document(&record).unwrap();

        assert!(html.contains("[X]</span> Ж"));
        assert!(html.contains("[ ]</span> М"));
        assert!(html.contains("[X]</span> Да"));
        assert!(html.contains("[ ]</span> Нет"));
    }

    #[test]
    fn test_values_are_escaped() {
        let record = filled(FormType::Form075)
            .with_field(fields::WORK_PLACE, "<script>alert(1)</script>".into())
            .unwrap();
        let html = render_document(&record).unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_print_view_has_print_hook() {
        let html = render_print_view(&filled(FormType::Form075)).unwrap();
        assert!(html.contains("window.print()"));
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename(&filled(FormType::Form075)),
            "MedScribe_Form_075_Иванов Иван.doc"
        );
        assert_eq!(
            export_filename(&DocumentRecord::empty(FormType::Form003)),
            "MedScribe_Form_003_Doc.doc"
        );

        let record = DocumentRecord::empty(FormType::Form027)
            .with_field(fields::PATIENT_NAME, "a/b\\c:d".into())
            .unwrap();
        assert_eq!(export_filename(&record), "MedScribe_Form_027_a_b_c_d.doc");
    }
}
