//! Consultation history
//!
//! An append-only, most-recent-first log of generated documents. Entries
//! are snapshots: loading one hands out a copy and leaves the entry as it
//! was stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::form::FormType;
use crate::record::DocumentRecord;

/// Illustrative manual-entry time per form; not derived from measurement
pub const MINUTES_SAVED_PER_FORM: u64 = 15;

/// One successful generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationHistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub patient_name: String,
    pub form_type: FormType,
    pub summary: String,
    pub record: DocumentRecord,
}

impl ConsultationHistoryEntry {
    pub fn from_record(record: DocumentRecord, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            patient_name: record.patient_label().to_string(),
            form_type: record.form_type,
            summary: record.summary().to_string(),
            record,
        }
    }
}

/// Aggregate figures over the history log
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total: usize,
    pub by_form: BTreeMap<FormType, usize>,
    pub minutes_saved: u64,
}

/// Most-recent-first list of entries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConsultationHistory {
    entries: Vec<ConsultationHistoryEntry>,
}

impl ConsultationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend an entry for a freshly generated record
    pub fn record(&mut self, record: DocumentRecord) -> &ConsultationHistoryEntry {
        self.push(ConsultationHistoryEntry::from_record(record, Utc::now()))
    }

    /// Prepend an already-built entry
    pub fn push(&mut self, entry: ConsultationHistoryEntry) -> &ConsultationHistoryEntry {
        self.entries.insert(0, entry);
        &self.entries[0]
    }

    pub fn entries(&self) -> &[ConsultationHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: Uuid) -> Option<&ConsultationHistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Copy of an entry's record, for loading into an editing session
    pub fn load(&self, id: Uuid) -> Option<DocumentRecord> {
        self.find(id).map(|entry| entry.record.clone())
    }

    pub fn stats(&self) -> HistoryStats {
        let mut by_form = BTreeMap::new();
        for entry in &self.entries {
            *by_form.entry(entry.form_type).or_insert(0) += 1;
        }
        HistoryStats {
            total: self.entries.len(),
            by_form,
            minutes_saved: self.entries.len() as u64 * MINUTES_SAVED_PER_FORM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use crate::schema::fields;
    use chrono::TimeZone;

    fn record(form: FormType, patient: &str) -> DocumentRecord {
        DocumentRecord::empty(form)
            .with_field(fields::PATIENT_NAME, FieldValue::from(patient))
            .unwrap()
            .with_field(fields::SHORT_SUMMARY, "Жалобы на кашель.".into())
            .unwrap()
    }

    #[test]
    fn test_most_recent_first() {
        let mut history = ConsultationHistory::new();
        history.record(record(FormType::Form075, "Первый"));
        history.record(record(FormType::Form027, "Второй"));

        let names: Vec<_> = history.entries().iter().map(|e| e.patient_name.as_str()).collect();
        assert_eq!(names, vec!["Второй", "Первый"]);
    }

    #[test]
    fn test_entry_snapshot_fields() {
        let mut history = ConsultationHistory::new();
        let entry = history.record(record(FormType::Form003, "")).clone();

        assert_eq!(entry.patient_name, crate::record::UNKNOWN_PATIENT);
        assert_eq!(entry.form_type, FormType::Form003);
        assert_eq!(entry.summary, "Жалобы на кашель.");
    }

    #[test]
    fn test_load_returns_copy() {
        let mut history = ConsultationHistory::new();
        let id = history.record(record(FormType::Form075, "Иванов")).id;

        let mut loaded = history.load(id).unwrap();
        loaded.set_field(fields::PATIENT_NAME, "Петров".into()).unwrap();

        assert_eq!(history.find(id).unwrap().record.text(fields::PATIENT_NAME), "Иванов");
        assert!(history.load(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_stats() {
        let mut history = ConsultationHistory::new();
        history.record(record(FormType::Form075, "A"));
        history.record(record(FormType::Form075, "B"));
        history.record(record(FormType::Form003, "C"));

        let stats = history.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_form.get(&FormType::Form075), Some(&2));
        assert_eq!(stats.by_form.get(&FormType::Form027), None);
        assert_eq!(stats.minutes_saved, 3 * MINUTES_SAVED_PER_FORM);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut history = ConsultationHistory::new();
        let timestamp = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        history.push(ConsultationHistoryEntry::from_record(
            record(FormType::Form027, "Иванов"),
            timestamp,
        ));

        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["patientName"], "Иванов");
        assert_eq!(json[0]["formType"], "027");

        let back: ConsultationHistory = serde_json::from_value(json).unwrap();
        assert_eq!(back, history);
    }
}
