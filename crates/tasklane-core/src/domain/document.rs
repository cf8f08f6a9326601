//! Archived documents as reported by the archive service (read-only).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::event::Category;

/// Archive-side status of a document. Statuses this crate does not know
/// decode to [`ArchiveStatus::Unrecognized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchiveStatus {
    #[serde(alias = "UKJENT")]
    Unknown,
    #[serde(alias = "OPPLASTING_DOKUMENT")]
    UploadingDocument,
    #[serde(alias = "RESERVERT")]
    Reserved,
    #[serde(alias = "UKJENT_BRUKER")]
    UnknownUser,
    #[serde(alias = "AVBRUTT")]
    Cancelled,
    #[serde(alias = "UTGAAR")]
    Expired,
    #[serde(alias = "FEILREGISTRERT")]
    Misregistered,
    #[serde(alias = "UNDER_ARBEID")]
    InProgress,
    #[serde(alias = "EKSPEDERT")]
    Expedited,
    #[serde(alias = "FERDIGSTILT")]
    Finalized,
    #[serde(alias = "JOURNALFOERT")]
    Journaled,
    #[serde(alias = "MOTTATT")]
    Received,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedDocument {
    #[serde(alias = "journalpostId")]
    pub doc_id: String,

    #[serde(alias = "journalstatus")]
    pub archive_status: ArchiveStatus,

    #[serde(default, alias = "tema")]
    pub category: Option<Category>,

    #[serde(default, alias = "journalforendeEnhet")]
    pub routing_unit: Option<String>,

    #[serde(default, alias = "datoOpprettet")]
    pub created_at: Option<NaiveDateTime>,
}

impl ArchivedDocument {
    /// Only documents still being worked on can get a follow-up task.
    pub fn is_reconcilable(&self) -> bool {
        self.archive_status == ArchiveStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_archive_payload_with_legacy_names() {
        let json = r#"{
            "journalpostId": "645601988",
            "journalstatus": "UNDER_ARBEID",
            "tema": "PEN",
            "journalforendeEnhet": "4303",
            "datoOpprettet": "2024-01-02T10:15:00",
            "tittel": "ignored"
        }"#;
        let doc: ArchivedDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.archive_status, ArchiveStatus::InProgress);
        assert_eq!(doc.category, Some(Category::Pension));
        assert!(doc.is_reconcilable());
    }

    #[test]
    fn finalized_document_is_not_reconcilable() {
        let json = r#"{"docId": "1", "archiveStatus": "FINALIZED"}"#;
        let doc: ArchivedDocument = serde_json::from_str(json).unwrap();
        assert!(!doc.is_reconcilable());
        assert_eq!(doc.category, None);
    }

    #[test]
    fn unknown_status_decodes_and_is_not_reconcilable() {
        let json = r#"{"journalpostId": "2", "journalstatus": "OPPLASTING_ARKIV"}"#;
        let doc: ArchivedDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.archive_status, ArchiveStatus::Unrecognized);
        assert!(!doc.is_reconcilable());
    }
}
