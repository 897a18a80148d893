//! Instruction text sent to the extraction model

use crate::form::{FormType, LanguageHint};
use crate::schema::fields;

/// Language every extracted value must be written in
pub const OUTPUT_LANGUAGE: &str = "Russian";

const SCRIBE_ROLE: &str = "You are an expert medical scribe assistant.";

/// Build the instruction that accompanies recorded consultation audio
pub fn build_prompt(form_type: FormType, language: LanguageHint) -> String {
    let descriptor = form_type.descriptor();
    let mut prompt = format!(
        "{SCRIBE_ROLE}\nListen to this doctor-patient consultation.\n\
         Extract the relevant information to fill out {}.\n",
        descriptor.prompt_subject
    );
    push_language_line(&mut prompt, language, "is spoken");
    push_rules(&mut prompt, form_type, "audio", "voice");
    prompt
}

/// Build the instruction for pasted notes or typed dictation
pub fn build_text_prompt(form_type: FormType, language: LanguageHint, notes: &str) -> String {
    let descriptor = form_type.descriptor();
    let mut prompt = format!(
        "{SCRIBE_ROLE}\nAnalyze the following medical consultation notes and extract \
         information to fill out {}.\n\nNotes: \"{}\"\n\n",
        descriptor.prompt_subject,
        notes.trim()
    );
    push_language_line(&mut prompt, language, "are written");
    push_rules(&mut prompt, form_type, "notes", "phrasing");
    prompt
}

fn push_language_line(prompt: &mut String, language: LanguageHint, verb: &str) {
    match language.spoken_name() {
        Some(name) => prompt.push_str(&format!("The consultation {verb} in {name}.\n")),
        None => prompt.push_str(&format!(
            "The consultation {verb} in English, Russian or Kazakh.\n"
        )),
    }
}

fn push_rules(prompt: &mut String, form_type: FormType, source: &str, cue: &str) {
    let code = form_type.code();
    let field_list = form_type
        .schema()
        .field_names()
        .collect::<Vec<_>>()
        .join(", ");

    prompt.push_str("\nCRITICAL RULES:\n");
    prompt.push_str(&format!(
        "1. Values MUST be in {OUTPUT_LANGUAGE}, regardless of the language of the {source}.\n"
    ));
    prompt.push_str(&format!(
        "2. If specific details (like IIN, address, workplace) are NOT mentioned in the {source}, \
         return an EMPTY STRING (\"\"). DO NOT invent, hallucinate, or generate placeholder data \
         such as \"N/A\" or \"не указано\". Only use what is explicitly said.\n"
    ));
    prompt.push_str(&format!(
        "3. The only exception: {} and {} may be inferred from {cue} or context when not stated.\n",
        fields::GENDER,
        fields::AGE
    ));
    prompt.push_str(&format!(
        "4. Always write {} as a one-sentence clinical summary of the consultation, \
         even when other fields are empty.\n",
        fields::SHORT_SUMMARY
    ));
    prompt.push_str(&format!(
        "5. Output strictly valid JSON for Form {code} with exactly these keys: {field_list}.\n"
    ));
}
