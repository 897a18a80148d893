use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DocumentError;
use crate::schema::{self, FieldSchema};

/// Kazakhstan medical form types supported by the scribe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormType {
    /// Medical certificate (professional consultative conclusion)
    #[serde(rename = "075")]
    Form075,
    /// Extract from an outpatient/inpatient medical card
    #[serde(rename = "027")]
    Form027,
    /// Inpatient medical card
    #[serde(rename = "003")]
    Form003,
}

impl FormType {
    pub const ALL: [FormType; 3] = [FormType::Form075, FormType::Form027, FormType::Form003];

    /// Bare numeral, as used in file names and the wire format
    pub fn numeral(self) -> &'static str {
        match self {
            FormType::Form075 => "075",
            FormType::Form027 => "027",
            FormType::Form003 => "003",
        }
    }

    /// Official identifier, e.g. `075/у`
    pub fn code(self) -> &'static str {
        self.descriptor().code
    }

    /// The single lookup point for everything that varies by form type
    pub fn descriptor(self) -> &'static FormDescriptor {
        match self {
            FormType::Form075 => &FORM_075,
            FormType::Form027 => &FORM_027,
            FormType::Form003 => &FORM_003,
        }
    }

    pub fn schema(self) -> &'static FieldSchema {
        schema::schema_for(self)
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.numeral())
    }
}

impl FromStr for FormType {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept `075`, `075/у` (Cyrillic) and `075/y` (Latin)
        let numeral = s
            .trim()
            .trim_end_matches("/у")
            .trim_end_matches("/y")
            .trim_end_matches("/Y");
        FormType::ALL
            .into_iter()
            .find(|form| form.numeral() == numeral)
            .ok_or_else(|| DocumentError::UnknownFormType(s.to_string()))
    }
}

/// Per-form metadata shared by the prompt builder, the schema registry and the exporter
#[derive(Debug)]
pub struct FormDescriptor {
    pub form_type: FormType,
    pub code: &'static str,
    /// Official Russian title printed on the form
    pub title: &'static str,
    /// What the clinician is filling in, as phrased to the model
    pub prompt_subject: &'static str,
    /// Name of the export template registered with the renderer
    pub template: &'static str,
}

static FORM_075: FormDescriptor = FormDescriptor {
    form_type: FormType::Form075,
    code: "075/у",
    title: "Медицинская справка (врачебное профессионально-консультативное заключение)",
    prompt_subject: "Kazakhstan Medical Form 075/у (medical certificate, professional consultative conclusion)",
    template: "form_075.html",
};

static FORM_027: FormDescriptor = FormDescriptor {
    form_type: FormType::Form027,
    code: "027/у",
    title: "Выписка из медицинской карты амбулаторного, стационарного больного",
    prompt_subject: "Kazakhstan Medical Form 027/у (extract from the outpatient/inpatient medical card)",
    template: "form_027.html",
};

static FORM_003: FormDescriptor = FormDescriptor {
    form_type: FormType::Form003,
    code: "003/у",
    title: "Медицинская карта стационарного пациента",
    prompt_subject: "Kazakhstan Medical Form 003/у (inpatient medical card)",
    template: "form_003.html",
};

/// Language the consultation was spoken or written in
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LanguageHint {
    #[default]
    Auto,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ru")]
    Russian,
    #[serde(rename = "kk")]
    Kazakh,
}

impl LanguageHint {
    /// English name used inside prompts, `None` when the model should detect it
    pub fn spoken_name(self) -> Option<&'static str> {
        match self {
            LanguageHint::Auto => None,
            LanguageHint::English => Some("English"),
            LanguageHint::Russian => Some("Russian"),
            LanguageHint::Kazakh => Some("Kazakh"),
        }
    }
}
