//! HttpTaskClient - タスク API の HTTP 実装

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, info};

use super::http::{self, CORRELATION_HEADER};
use super::retry::RetryPolicy;
use crate::domain::{ClientError, StatusBucket, Task, TaskId, TaskPage, TaskPatch};
use crate::ports::{TaskApi, TokenProvider};

/// Task API client.
///
/// - `POST {base}/tasks`
/// - `PATCH {base}/tasks/{id}`
/// - `GET {base}/tasks/{id}`
/// - `GET {base}/tasks?status=OPEN|CLOSED&docId=…`
pub struct HttpTaskClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    retry: RetryPolicy,
}

impl HttpTaskClient {
    pub fn new(
        base_url: &str,
        tokens: Arc<dyn TokenProvider>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: http::build_client(timeout)?,
            base_url: http::base_url(base_url)?,
            tokens,
            retry,
        })
    }

    async fn find_task(
        &self,
        operation: &'static str,
        bucket: StatusBucket,
        doc_id: &str,
    ) -> Result<Option<Task>, ClientError> {
        let token = self.tokens.token().await?;
        let correlation_id = http::correlation_id();
        let url = format!("{}/tasks", self.base_url);
        debug!(operation, doc_id, correlation_id = %correlation_id, "searching tasks");

        let response = http::send(&self.retry, operation, || {
            self.http
                .get(&url)
                .query(&[("status", bucket.as_str()), ("docId", doc_id)])
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(CORRELATION_HEADER, &correlation_id)
        })
        .await?;
        let response = http::check_status(operation, response).await?;
        let page: TaskPage = http::decode(operation, response).await?;
        Ok(page.tasks.into_iter().next())
    }
}

#[async_trait]
impl TaskApi for HttpTaskClient {
    async fn create_task(&self, task: &Task) -> Result<(), ClientError> {
        const OP: &str = "create_task";
        let token = self.tokens.token().await?;
        let correlation_id = http::correlation_id();
        let url = format!("{}/tasks", self.base_url);

        let response = http::send(&self.retry, OP, || {
            self.http
                .post(&url)
                .json(task)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(CORRELATION_HEADER, &correlation_id)
        })
        .await?;
        http::check_status(OP, response).await?;

        info!(
            task_type = %task.task_type_code,
            assigned_unit = %task.assigned_unit,
            doc_id = task.archive_doc_id.as_deref().unwrap_or("-"),
            correlation_id = %correlation_id,
            "task created"
        );
        Ok(())
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<(), ClientError> {
        const OP: &str = "update_task";
        let token = self.tokens.token().await?;
        let correlation_id = http::correlation_id();
        let url = format!("{}/tasks/{task_id}", self.base_url);

        let response = http::send(&self.retry, OP, || {
            self.http
                .patch(&url)
                .json(patch)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(CORRELATION_HEADER, &correlation_id)
        })
        .await?;
        http::check_status(OP, response).await?;

        info!(%task_id, correlation_id = %correlation_id, "task updated");
        Ok(())
    }

    async fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, ClientError> {
        const OP: &str = "get_task";
        let token = self.tokens.token().await?;
        let correlation_id = http::correlation_id();
        let url = format!("{}/tasks/{task_id}", self.base_url);

        let response = http::send(&self.retry, OP, || {
            self.http
                .get(&url)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(CORRELATION_HEADER, &correlation_id)
        })
        .await?;
        if http::is_not_found(&response) {
            return Ok(None);
        }
        let response = http::check_status(OP, response).await?;
        http::decode(OP, response).await.map(Some)
    }

    async fn find_open_task(&self, doc_id: &str) -> Result<Option<Task>, ClientError> {
        self.find_task("find_open_task", StatusBucket::Open, doc_id)
            .await
    }

    async fn find_closed_task(&self, doc_id: &str) -> Result<Option<Task>, ClientError> {
        self.find_task("find_closed_task", StatusBucket::Closed, doc_id)
            .await
    }
}
