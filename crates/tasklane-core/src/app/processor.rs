//! EventProcessor - 1 メッセージの処理（create / update のルーティング）
//!
//! The processor never acknowledges anything itself: it returns a
//! [`Processed`] on success and a [`ProcessError`] otherwise, and the lane
//! decides what happens to the record.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::description::describe;
use crate::domain::{
    ProcessError, Task, TaskId, TaskPatch, TaskRequestEvent, TaskTypeCode, TaskUpdateEvent,
};
use crate::ports::{Clock, ConsumerRecord, TaskApi};

/// Which topic carries which event shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRoutes {
    pub create_topic: String,
    pub update_topic: String,
}

impl Default for TopicRoutes {
    fn default() -> Self {
        Self {
            create_topic: "task-create".to_string(),
            update_topic: "task-update".to_string(),
        }
    }
}

/// Result of a successfully processed record.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    Created {
        task_type: TaskTypeCode,
        assigned_unit: String,
    },
    Updated {
        task_id: TaskId,
    },
}

/// The task a create event asks for, dated `today`.
pub fn task_for_event(event: &TaskRequestEvent, today: NaiveDate) -> Result<Task, ProcessError> {
    let description = describe(event)?;
    Ok(Task::new(
        description.task_type,
        event.assigned_unit.clone(),
        description.text,
        event.category.clone(),
        today,
    )
    .with_archive_doc_id(event.archive_doc_id.clone())
    .with_person_ref(event.person_ref.clone()))
}

pub struct EventProcessor {
    tasks: Arc<dyn TaskApi>,
    clock: Arc<dyn Clock>,
    routes: TopicRoutes,
}

impl EventProcessor {
    pub fn new(tasks: Arc<dyn TaskApi>, clock: Arc<dyn Clock>, routes: TopicRoutes) -> Self {
        Self {
            tasks,
            clock,
            routes,
        }
    }

    pub fn routes(&self) -> &TopicRoutes {
        &self.routes
    }

    /// Build the task a create event would produce, without sending it.
    pub fn build_task(&self, event: &TaskRequestEvent) -> Result<Task, ProcessError> {
        task_for_event(event, self.clock.today())
    }

    pub async fn process(&self, record: &ConsumerRecord) -> Result<Processed, ProcessError> {
        if record.topic == self.routes.create_topic {
            let event = TaskRequestEvent::from_json(&record.payload)?;
            self.create(&event).await
        } else if record.topic == self.routes.update_topic {
            let event = TaskUpdateEvent::from_json(&record.payload)?;
            self.update(&event).await
        } else {
            Err(ProcessError::input(format!(
                "no route for topic {:?}",
                record.topic
            )))
        }
    }

    async fn create(&self, event: &TaskRequestEvent) -> Result<Processed, ProcessError> {
        let task = self.build_task(event)?;
        debug!(
            task_kind = %event.task_kind,
            case_id = %event.case_id,
            "creating task"
        );
        self.tasks.create_task(&task).await?;
        Ok(Processed::Created {
            task_type: task.task_type_code,
            assigned_unit: task.assigned_unit,
        })
    }

    async fn update(&self, event: &TaskUpdateEvent) -> Result<Processed, ProcessError> {
        let existing = self
            .tasks
            .get_task(event.task_id)
            .await?
            .ok_or_else(|| ProcessError::input(format!("task {} does not exist", event.task_id)))?;

        match &existing.status {
            Some(status) if status.is_open() => {}
            other => {
                let status = other.as_ref().map_or("unknown", |s| s.as_str());
                return Err(ProcessError::input(format!(
                    "task {} is not open (status {status})",
                    event.task_id
                )));
            }
        }

        let patch = TaskPatch {
            status: Some(event.status.clone()),
            assigned_unit: Some(event.assigned_unit.clone()),
            category: Some(event.category.clone()),
            version: existing.version,
        };
        self.tasks.update_task(event.task_id, &patch).await?;
        info!(task_id = %event.task_id, status = %event.status, "task update forwarded");
        Ok(Processed::Updated {
            task_id: event.task_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, ErrorKind, TaskStatus};
    use crate::impls::InMemoryTaskApi;
    use crate::ports::FixedClock;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn setup() -> (Arc<InMemoryTaskApi>, EventProcessor) {
        let api = Arc::new(InMemoryTaskApi::new());
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let processor = EventProcessor::new(api.clone(), Arc::new(clock), TopicRoutes::default());
        (api, processor)
    }

    fn record(topic: &str, payload: &str) -> ConsumerRecord {
        ConsumerRecord {
            topic: topic.into(),
            partition: 0,
            offset: 0,
            key: None,
            payload: payload.into(),
        }
    }

    const ROUTING_EVENT: &str = r#"{
        "sedCode": "P2000",
        "archiveDocId": "429434378",
        "assignedUnit": "4303",
        "personRef": "1000101917358",
        "taskKind": "ROUTING_IN",
        "caseId": "148161",
        "eventDirection": "SENT"
    }"#;

    #[tokio::test]
    async fn create_event_creates_described_task() {
        let (api, processor) = setup();
        let outcome = processor
            .process(&record("task-create", ROUTING_EVENT))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Processed::Created {
                task_type: TaskTypeCode::Routing,
                assigned_unit: "4303".into()
            }
        );

        let created = api.created().await;
        assert_eq!(created.len(), 1);
        let task = &created[0];
        assert_eq!(
            task.description,
            "Utgående P2000 - Krav om alderspensjon / saksnr: 148161"
        );
        assert_eq!(task.creating_unit, "9999");
        assert_eq!(task.archive_doc_id.as_deref(), Some("429434378"));
        assert_eq!(task.person_ref.as_deref(), Some("1000101917358"));
        assert_eq!(task.active_from, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }

    #[tokio::test]
    async fn unresolved_review_is_input_error_without_side_effects() {
        let (api, processor) = setup();
        let payload = r#"{
            "sedCode": "P2000",
            "archiveDocId": "1",
            "assignedUnit": "4303",
            "taskKind": "REVIEW_DOCUMENT",
            "caseId": "1",
            "eventDirection": "RECEIVED",
            "attachmentName": "x.doc"
        }"#;
        let err = processor
            .process(&record("task-create", payload))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(api.created().await.is_empty());
    }

    #[tokio::test]
    async fn update_of_open_task_carries_version() {
        let (api, processor) = setup();
        let mut existing = Task::new(
            TaskTypeCode::Routing,
            "4303",
            "x",
            Category::Pension,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        existing.status = Some(TaskStatus::Opened);
        existing.version = Some(2);
        let id = api.insert(existing).await;

        let payload = format!(
            r#"{{"taskId": {id}, "status": "UNDER_BEHANDLING", "assignedUnit": "4862", "category": "UFO"}}"#
        );
        let outcome = processor
            .process(&record("task-update", &payload))
            .await
            .unwrap();
        assert_eq!(outcome, Processed::Updated { task_id: id });

        let (patched_id, patch) = api.updates().await.remove(0);
        assert_eq!(patched_id, id);
        assert_eq!(patch.version, Some(2));
        assert_eq!(patch.category, Some(Category::Disability));

        let task = api.task(id).await.unwrap();
        assert_eq!(task.assigned_unit, "4862");
        assert_eq!(task.status, Some(TaskStatus::InProgress));
    }

    #[tokio::test]
    async fn update_of_missing_task_fails() {
        let (_api, processor) = setup();
        let payload = r#"{"taskId": 999, "status": "FERDIGSTILT", "assignedUnit": "4303"}"#;
        let err = processor
            .process(&record("task-update", payload))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.message().contains("999"));
    }

    #[tokio::test]
    async fn update_of_closed_task_fails() {
        let (api, processor) = setup();
        let mut closed = Task::new(
            TaskTypeCode::Routing,
            "4303",
            "x",
            Category::Pension,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        closed.status = Some(TaskStatus::Finalized);
        let id = api.insert(closed).await;

        let payload = format!(r#"{{"taskId": {id}, "status": "AAPNET", "assignedUnit": "4303"}}"#);
        let err = processor
            .process(&record("task-update", &payload))
            .await
            .unwrap_err();
        assert!(err.message().contains("not open"));
        assert!(api.updates().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_topic_is_input_error() {
        let (_api, processor) = setup();
        let err = processor
            .process(&record("something-else", "{}"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }
}
