//! Detect an explicit request to switch form type inside free dictation
//!
//! Clinicians say things like "Form 027", "Давайте заполним Форму 027" or
//! "075 нысаны". Text input is matched lexically; audio (and text without a
//! lexical hit) is handed to the model with [`classifier_prompt`] and the
//! reply is read back with [`parse_classifier_reply`].

use regex::Regex;
use std::sync::OnceLock;

use crate::form::FormType;

/// Token the model returns when no form is requested
pub const NO_FORM: &str = "none";

fn form_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // A numeral not embedded in a longer number that carries a form
        // descriptor: "form"/"форма"/"нысан" before it, or "/у"/"нысаны" after.
        Regex::new(
            r"(?xi)
            (?:^|[^\d./])
            (?:
                (?:form|форм[аыуе]|нысан[ыа]?)\s*(?:№|no\.?|n)?\s*(?P<named>075|027|003)(?:\s*/\s*[уy])?
              | (?P<coded>075|027|003)\s*/\s*[уy]
              | (?P<kazakh>075|027|003)\s+нысан
            )
            (?:$|[^\d./]|\.(?:$|\D))",
        )
        .expect("form reference pattern is valid")
    })
}

fn bare_numeral() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*№?\s*(?P<num>075|027|003)\s*[.!]?\s*$")
            .expect("bare numeral pattern is valid")
    })
}

/// Find an explicit form reference in text, the first mention wins.
///
/// A numeral only counts on its own when it is the whole utterance;
/// inside a sentence it needs a descriptor, so "палата 003" is not a request.
pub fn match_form_reference(text: &str) -> Option<FormType> {
    if let Some(caps) = bare_numeral().captures(text) {
        return caps.name("num").and_then(|num| num.as_str().parse().ok());
    }
    form_reference().captures(text).and_then(|caps| {
        ["named", "coded", "kazakh"]
            .into_iter()
            .find_map(|group| caps.name(group))
            .and_then(|num| num.as_str().parse().ok())
    })
}

/// Instruction for the model-side classifier
pub fn classifier_prompt() -> String {
    format!(
        "Determine whether the speaker explicitly asks to fill out a specific medical form. \
         The speech may be in English, Russian or Kazakh, for example \"Form 075\", \
         \"Форма 027\", \"Давайте заполним Форму 003\" or \"075 нысаны\". \
         Supported forms: 075, 027, 003. \
         Reply with only the three-digit form number, or \"{NO_FORM}\" if no form is requested."
    )
}

/// Read the classifier reply; anything unrecognised counts as no request
pub fn parse_classifier_reply(reply: &str) -> Option<FormType> {
    let trimmed = reply.trim().trim_matches(|c| c == '"' || c == '`' || c == '.');
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_FORM) {
        return None;
    }
    trimmed
        .parse()
        .ok()
        .or_else(|| match_form_reference(trimmed))
}
