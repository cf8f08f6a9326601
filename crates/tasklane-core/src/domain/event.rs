//! Inbound event shapes: create-task and update-task.
//!
//! Both shapes ignore unknown fields. Field names follow the current wire
//! format (camelCase); the legacy producer field names are accepted as
//! aliases so that old records still on the topic can be replayed.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::sed::SedType;
use super::task::{TaskId, TaskStatus, TaskTypeCode};

/// What kind of human task the producer asks for.
///
/// Closed set: an unknown value fails decoding, which the lane treats as an
/// input error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    #[serde(alias = "GENERELL")]
    General,
    #[serde(alias = "JOURNALFORING")]
    RoutingIn,
    #[serde(alias = "JOURNALFORING_UT")]
    RoutingOut,
    #[serde(alias = "KRAV")]
    Claim,
    #[serde(alias = "BEHANDLE_SED")]
    ReviewDocument,
    #[serde(alias = "PDL")]
    IdentityMismatch,
}

impl TaskKind {
    /// Static task-type code table.
    pub fn task_type(self) -> TaskTypeCode {
        match self {
            TaskKind::General => TaskTypeCode::General,
            TaskKind::RoutingIn => TaskTypeCode::Routing,
            TaskKind::RoutingOut => TaskTypeCode::RoutingOut,
            TaskKind::ReviewDocument | TaskKind::IdentityMismatch => TaskTypeCode::ReviewDocument,
            TaskKind::Claim => TaskTypeCode::Claim,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::General => "GENERAL",
            TaskKind::RoutingIn => "ROUTING_IN",
            TaskKind::RoutingOut => "ROUTING_OUT",
            TaskKind::Claim => "CLAIM",
            TaskKind::ReviewDocument => "REVIEW_DOCUMENT",
            TaskKind::IdentityMismatch => "IDENTITY_MISMATCH",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventDirection {
    #[serde(alias = "MOTTATT")]
    Received,
    #[serde(alias = "SENDT")]
    Sent,
}

/// Subject area (tema) of a task or archived document.
///
/// Serialized as the short code used by the task and archive APIs. Codes we
/// have no variant for are kept verbatim so categories from either side can
/// still be compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    Pension,
    Disability,
    Adjustment,
    ChildPension,
    Other(String),
}

impl Category {
    pub fn code(&self) -> &str {
        match self {
            Category::Pension => "PEN",
            Category::Disability => "UFO",
            Category::Adjustment => "EYO",
            Category::ChildPension => "EYB",
            Category::Other(code) => code,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PEN" | "PENSION" | "PENSJON" => Category::Pension,
            "UFO" | "DISABILITY" | "UFORETRYGD" => Category::Disability,
            "EYO" | "ADJUSTMENT" | "OMSTILLING" => Category::Adjustment,
            "EYB" | "CHILD_PENSION" | "EYBARNEP" => Category::ChildPension,
            _ => Category::Other(value),
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Treat an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Create intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequestEvent {
    #[serde(default, alias = "sakNr", skip_serializing_if = "Option::is_none")]
    pub document_ref_id: Option<String>,

    #[serde(default, alias = "sedType", skip_serializing_if = "Option::is_none")]
    pub sed_code: Option<SedType>,

    #[serde(default, alias = "journalpostId", skip_serializing_if = "Option::is_none")]
    pub archive_doc_id: Option<String>,

    #[serde(alias = "tildeltEnhetsnr")]
    pub assigned_unit: String,

    #[serde(default, alias = "aktoerId", skip_serializing_if = "Option::is_none")]
    pub person_ref: Option<String>,

    #[serde(alias = "oppgaveType")]
    pub task_kind: TaskKind,

    #[serde(alias = "rinaSakId")]
    pub case_id: String,

    #[serde(alias = "hendelseType")]
    pub event_direction: EventDirection,

    #[serde(default, alias = "filnavn", skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,

    #[serde(default, alias = "tema", deserialize_with = "null_as_default")]
    pub category: Category,

    #[serde(default, deserialize_with = "null_as_default")]
    pub warning_flag: bool,
}

impl TaskRequestEvent {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// `attachment_name` with empty strings treated as absent.
    pub fn attachment(&self) -> Option<&str> {
        self.attachment_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// Update intent for an already existing task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateEvent {
    #[serde(alias = "oppgaveId")]
    pub task_id: TaskId,

    pub status: TaskStatus,

    #[serde(alias = "tildeltEnhetsnr")]
    pub assigned_unit: String,

    #[serde(default, alias = "tema", deserialize_with = "null_as_default")]
    pub category: Category,
}

impl TaskUpdateEvent {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_current_wire_format() {
        let json = r#"{
            "sedCode": "P2000",
            "archiveDocId": "429434378",
            "assignedUnit": "4303",
            "personRef": "1000101917358",
            "taskKind": "ROUTING_IN",
            "caseId": "148161",
            "eventDirection": "SENT",
            "somethingNew": {"ignored": true}
        }"#;
        let event = TaskRequestEvent::from_json(json).unwrap();
        assert_eq!(event.sed_code, Some(SedType::P2000));
        assert_eq!(event.task_kind, TaskKind::RoutingIn);
        assert_eq!(event.event_direction, EventDirection::Sent);
        assert_eq!(event.category, Category::Pension);
        assert!(!event.warning_flag);
    }

    #[test]
    fn decodes_legacy_field_names() {
        let json = r#"{
          "sedType" : "P5000",
          "journalpostId" : "515094484",
          "tildeltEnhetsnr" : "4303",
          "aktoerId" : "1000021339877",
          "rinaSakId" : "8298756",
          "hendelseType" : "SENDT",
          "filnavn" : null,
          "oppgaveType" : "JOURNALFORING",
          "tema" : "UFO"
        }"#;
        let event = TaskRequestEvent::from_json(json).unwrap();
        assert_eq!(event.task_kind, TaskKind::RoutingIn);
        assert_eq!(event.archive_doc_id.as_deref(), Some("515094484"));
        assert_eq!(event.category, Category::Disability);
        assert_eq!(event.attachment(), None);
    }

    #[test]
    fn unknown_task_kind_fails_decoding() {
        let json = r#"{
            "assignedUnit": "4303",
            "taskKind": "SOMETHING_ELSE",
            "caseId": "1",
            "eventDirection": "SENT"
        }"#;
        let err = TaskRequestEvent::from_json(json).unwrap_err();
        assert!(err.to_string().contains("SOMETHING_ELSE"));
    }

    #[test]
    fn null_category_and_warning_fall_back_to_defaults() {
        let json = r#"{
            "assignedUnit": "4303",
            "taskKind": "GENERAL",
            "caseId": "1",
            "eventDirection": "RECEIVED",
            "category": null,
            "warningFlag": null
        }"#;
        let event = TaskRequestEvent::from_json(json).unwrap();
        assert_eq!(event.category, Category::Pension);
        assert!(!event.warning_flag);
    }

    #[test]
    fn empty_attachment_is_absent() {
        let json = r#"{
            "assignedUnit": "4303",
            "taskKind": "REVIEW_DOCUMENT",
            "caseId": "1",
            "eventDirection": "RECEIVED",
            "attachmentName": ""
        }"#;
        let event = TaskRequestEvent::from_json(json).unwrap();
        assert_eq!(event.attachment(), None);
    }

    #[test]
    fn category_keeps_unknown_codes() {
        let category = Category::from("AAP".to_string());
        assert_eq!(category, Category::Other("AAP".into()));
        assert_eq!(category.code(), "AAP");
        assert_eq!(Category::from("PENSION".to_string()).code(), "PEN");
    }

    #[test]
    fn decodes_update_event() {
        let json = r#"{"taskId": 42, "status": "UNDER_BEHANDLING", "assignedUnit": "4862"}"#;
        let event = TaskUpdateEvent::from_json(json).unwrap();
        assert_eq!(event.task_id, TaskId::new(42));
        assert_eq!(event.status, TaskStatus::InProgress);
        assert_eq!(event.category, Category::Pension);
    }
}
