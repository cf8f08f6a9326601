//! TaskApi port - 外部タスク API
//!
//! One method per logical operation; implementations make exactly one
//! external call per method (retries of a failed transport attempt aside).

use async_trait::async_trait;

use crate::domain::{ClientError, Task, TaskId, TaskPatch};

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn create_task(&self, task: &Task) -> Result<(), ClientError>;

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<(), ClientError>;

    /// `None` when the task does not exist.
    async fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, ClientError>;

    /// First open task registered on the archived document.
    async fn find_open_task(&self, doc_id: &str) -> Result<Option<Task>, ClientError>;

    /// First closed task registered on the archived document.
    async fn find_closed_task(&self, doc_id: &str) -> Result<Option<Task>, ClientError>;
}
