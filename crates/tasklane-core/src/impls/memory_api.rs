//! In-memory task API and archive, used for tests and dry runs.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ArchivedDocument, ClientError, Task, TaskId, TaskPatch, TaskStatus,
};
use crate::ports::{ArchiveApi, TaskApi};

struct TaskApiState {
    tasks: BTreeMap<TaskId, Task>,
    next_id: u64,
    created: Vec<TaskId>,
    updates: Vec<(TaskId, TaskPatch)>,
    failing_docs: HashSet<String>,
}

/// Task API fake.
///
/// Assigns ids, keeps every task, and records the create/update calls so
/// tests can assert on the side effects.
pub struct InMemoryTaskApi {
    state: Mutex<TaskApiState>,
}

impl InMemoryTaskApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TaskApiState {
                tasks: BTreeMap::new(),
                next_id: 1,
                created: Vec::new(),
                updates: Vec::new(),
                failing_docs: HashSet::new(),
            }),
        }
    }

    /// Seed an existing task (not counted as created).
    pub async fn insert(&self, mut task: Task) -> TaskId {
        let mut state = self.state.lock().await;
        let id = task.id.unwrap_or_else(|| TaskId::new(state.next_id));
        state.next_id = state.next_id.max(id.value() + 1);
        task.id = Some(id);
        state.tasks.insert(id, task);
        id
    }

    /// Make `create_task` fail with HTTP 500 for tasks on this document.
    pub async fn fail_creates_for(&self, doc_id: &str) {
        self.state
            .lock()
            .await
            .failing_docs
            .insert(doc_id.to_string());
    }

    pub async fn task(&self, id: TaskId) -> Option<Task> {
        self.state.lock().await.tasks.get(&id).cloned()
    }

    /// Tasks created through the API, in call order.
    pub async fn created(&self) -> Vec<Task> {
        let state = self.state.lock().await;
        state
            .created
            .iter()
            .filter_map(|id| state.tasks.get(id).cloned())
            .collect()
    }

    pub async fn updates(&self) -> Vec<(TaskId, TaskPatch)> {
        self.state.lock().await.updates.clone()
    }

    async fn find(&self, doc_id: &str, open: bool) -> Option<Task> {
        let state = self.state.lock().await;
        state
            .tasks
            .values()
            .find(|t| {
                t.archive_doc_id.as_deref() == Some(doc_id)
                    && t.status.as_ref().is_some_and(|s| s.is_open()) == open
            })
            .cloned()
    }
}

impl Default for InMemoryTaskApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskApi for InMemoryTaskApi {
    async fn create_task(&self, task: &Task) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        if let Some(doc_id) = &task.archive_doc_id
            && state.failing_docs.contains(doc_id)
        {
            return Err(ClientError::Status {
                operation: "create_task",
                status: 500,
                body: format!("simulated failure for {doc_id}"),
            });
        }

        let id = TaskId::new(state.next_id);
        state.next_id += 1;
        let mut stored = task.clone();
        stored.id = Some(id);
        stored.status = Some(TaskStatus::Created);
        stored.version = Some(1);
        state.tasks.insert(id, stored);
        state.created.push(id);
        Ok(())
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        let Some(task) = state.tasks.get_mut(&task_id) else {
            return Err(ClientError::Status {
                operation: "update_task",
                status: 404,
                body: format!("task {task_id} not found"),
            });
        };
        if let Some(version) = patch.version
            && task.version.is_some_and(|current| current != version)
        {
            return Err(ClientError::Status {
                operation: "update_task",
                status: 409,
                body: format!("version conflict on task {task_id}"),
            });
        }
        if let Some(status) = &patch.status {
            task.status = Some(status.clone());
        }
        if let Some(unit) = &patch.assigned_unit {
            task.assigned_unit = unit.clone();
        }
        if let Some(category) = &patch.category {
            task.category = category.clone();
        }
        task.version = Some(task.version.unwrap_or(0) + 1);
        state.updates.push((task_id, patch.clone()));
        Ok(())
    }

    async fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, ClientError> {
        Ok(self.task(task_id).await)
    }

    async fn find_open_task(&self, doc_id: &str) -> Result<Option<Task>, ClientError> {
        Ok(self.find(doc_id, true).await)
    }

    async fn find_closed_task(&self, doc_id: &str) -> Result<Option<Task>, ClientError> {
        Ok(self.find(doc_id, false).await)
    }
}

/// Archive fake keyed by document id.
#[derive(Default)]
pub struct InMemoryArchive {
    documents: Mutex<HashMap<String, ArchivedDocument>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, document: ArchivedDocument) {
        self.documents
            .lock()
            .await
            .insert(document.doc_id.clone(), document);
    }
}

#[async_trait]
impl ArchiveApi for InMemoryArchive {
    async fn get_document(&self, doc_id: &str) -> Result<Option<ArchivedDocument>, ClientError> {
        Ok(self.documents.lock().await.get(doc_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, TaskTypeCode};
    use chrono::NaiveDate;

    fn task(doc_id: &str) -> Task {
        Task::new(
            TaskTypeCode::Routing,
            "4303",
            "x",
            Category::Pension,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .with_archive_doc_id(Some(doc_id.into()))
    }

    #[tokio::test]
    async fn created_tasks_are_open() {
        let api = InMemoryTaskApi::new();
        api.create_task(&task("1")).await.unwrap();
        let open = api.find_open_task("1").await.unwrap().unwrap();
        assert_eq!(open.status, Some(TaskStatus::Created));
        assert!(api.find_closed_task("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_version_conflicts() {
        let api = InMemoryTaskApi::new();
        let mut seeded = task("1");
        seeded.version = Some(4);
        seeded.status = Some(TaskStatus::Opened);
        let id = api.insert(seeded).await;

        let patch = TaskPatch {
            version: Some(3),
            ..TaskPatch::default()
        };
        let err = api.update_task(id, &patch).await.unwrap_err();
        assert_eq!(err.status(), Some(409));
    }
}
