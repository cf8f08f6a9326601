//! Task: the work item owned by the external task API.
//!
//! We build tasks and send them, and we read tasks back when reconciling,
//! but we never keep or mutate one locally.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::event::Category;

/// Unit that every task created by this service is registered under.
pub const CREATING_UNIT: &str = "9999";

/// Identifier assigned by the task API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Task type code as understood by the task API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskTypeCode {
    General,
    Routing,
    RoutingOut,
    ReviewDocument,
    Claim,
    Other(String),
}

impl TaskTypeCode {
    pub fn as_str(&self) -> &str {
        match self {
            TaskTypeCode::General => "GEN",
            TaskTypeCode::Routing => "JFR",
            TaskTypeCode::RoutingOut => "JFR_UT",
            TaskTypeCode::ReviewDocument => "BEH_SED",
            TaskTypeCode::Claim => "KRA",
            TaskTypeCode::Other(code) => code,
        }
    }
}

impl From<String> for TaskTypeCode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "GEN" => TaskTypeCode::General,
            "JFR" => TaskTypeCode::Routing,
            "JFR_UT" | "JOURNALFORING_UT" => TaskTypeCode::RoutingOut,
            "BEH_SED" => TaskTypeCode::ReviewDocument,
            "KRA" => TaskTypeCode::Claim,
            _ => TaskTypeCode::Other(value),
        }
    }
}

impl From<TaskTypeCode> for String {
    fn from(value: TaskTypeCode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TaskTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status reported by the task API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Created,
    Opened,
    InProgress,
    Finalized,
    Misregistered,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Created => "OPPRETTET",
            TaskStatus::Opened => "AAPNET",
            TaskStatus::InProgress => "UNDER_BEHANDLING",
            TaskStatus::Finalized => "FERDIGSTILT",
            TaskStatus::Misregistered => "FEILREGISTRERT",
            TaskStatus::Other(s) => s,
        }
    }

    /// Is the task still open for work (and therefore updatable)?
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            TaskStatus::Created | TaskStatus::Opened | TaskStatus::InProgress
        )
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "OPPRETTET" => TaskStatus::Created,
            "AAPNET" => TaskStatus::Opened,
            "UNDER_BEHANDLING" => TaskStatus::InProgress,
            "FERDIGSTILT" => TaskStatus::Finalized,
            "FEILREGISTRERT" => TaskStatus::Misregistered,
            _ => TaskStatus::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which status bucket a task query searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    Open,
    Closed,
}

impl StatusBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusBucket::Open => "OPEN",
            StatusBucket::Closed => "CLOSED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "HOY")]
    High,
    #[default]
    #[serde(rename = "NORM")]
    Normal,
    #[serde(rename = "LAV")]
    Low,
}

/// A task as sent to and read from the task API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,

    #[serde(default)]
    pub assigned_unit: String,

    #[serde(default)]
    pub creating_unit: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_doc_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_ref: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: Category,

    pub task_type_code: TaskTypeCode,

    #[serde(default)]
    pub priority: Priority,

    pub active_from: NaiveDate,

    pub due_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl Task {
    /// A fresh task: created by us, normal priority, active today, due tomorrow.
    pub fn new(
        task_type_code: TaskTypeCode,
        assigned_unit: impl Into<String>,
        description: impl Into<String>,
        category: Category,
        today: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            assigned_unit: assigned_unit.into(),
            creating_unit: CREATING_UNIT.to_string(),
            archive_doc_id: None,
            person_ref: None,
            description: description.into(),
            category,
            task_type_code,
            priority: Priority::Normal,
            active_from: today,
            due_date: today.checked_add_days(Days::new(1)).unwrap_or(today),
            status: None,
            version: None,
        }
    }

    pub fn with_archive_doc_id(mut self, doc_id: Option<String>) -> Self {
        self.archive_doc_id = doc_id;
        self
    }

    pub fn with_person_ref(mut self, person_ref: Option<String>) -> Self {
        self.person_ref = person_ref;
        self
    }
}

/// Partial task sent with an update call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,

    /// Version of the task the patch was computed against (optimistic locking).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

/// Response body of a task search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskPage {
    #[serde(default, alias = "antallTreffTotalt")]
    pub count: u64,

    #[serde(default, alias = "oppgaver")]
    pub tasks: Vec<Task>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()
    }

    #[test]
    fn new_task_has_fixed_fields() {
        let task = Task::new(
            TaskTypeCode::Routing,
            "4303",
            "Utgående P2000",
            Category::Pension,
            today(),
        );
        assert_eq!(task.creating_unit, "9999");
        assert_eq!(task.priority, Priority::Normal);
        assert_eq!(task.active_from, today());
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let task = Task::new(
            TaskTypeCode::ReviewDocument,
            "4803",
            "x",
            Category::Pension,
            today(),
        )
        .with_person_ref(Some("1000101917358".into()));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["taskTypeCode"], "BEH_SED");
        assert_eq!(json["priority"], "NORM");
        assert_eq!(json["category"], "PEN");
        assert_eq!(json["activeFrom"], "2024-02-28");
        assert!(json.get("archiveDocId").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn decodes_search_page() {
        let json = r#"{
            "count": 1,
            "tasks": [{
                "id": 5436732,
                "assignedUnit": "4303",
                "creatingUnit": "9999",
                "archiveDocId": "645601988",
                "description": "Utgående P8000 - Forespørsel om informasjon / saksnr: 1447360",
                "category": "PEN",
                "taskTypeCode": "JFR",
                "priority": "NORM",
                "activeFrom": "2024-01-02",
                "dueDate": "2024-01-03",
                "status": "FERDIGSTILT",
                "version": 3
            }]
        }"#;
        let page: TaskPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.count, 1);
        let task = &page.tasks[0];
        assert_eq!(task.id, Some(TaskId::new(5436732)));
        assert_eq!(task.status, Some(TaskStatus::Finalized));
        assert!(!task.status.as_ref().unwrap().is_open());
    }

    #[test]
    fn unknown_status_and_type_are_preserved() {
        assert_eq!(
            TaskStatus::from("VENTER".to_string()),
            TaskStatus::Other("VENTER".into())
        );
        assert_eq!(TaskTypeCode::from("VUR".to_string()).as_str(), "VUR");
        assert!(TaskStatus::Opened.is_open());
    }
}
