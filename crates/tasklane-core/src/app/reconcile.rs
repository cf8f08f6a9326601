//! Reconciler - アーカイブとタスク API の不整合を修復するスイープ
//!
//! For every candidate document that is still in progress in the archive but
//! whose task was finalized, create one follow-up routing task. The ledger
//! makes the sweep idempotent: a document is handled at most once.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use ulid::Ulid;

use crate::domain::{
    ArchiveStatus, Category, ClientError, ErrorKind, Task, TaskStatus, TaskTypeCode,
};
use crate::ports::{ArchiveApi, Clock, Ledger, LedgerError, TaskApi};
use crate::redact::mask_pii;

/// Marker in a task description that identifies an outbound document.
pub const OUTBOUND_MARKER: &str = "Utg";

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("ledger marker encoding failed: {0}")]
    Marker(#[from] serde_json::Error),
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::Client(err) => err.kind(),
            ReconcileError::Ledger(_) | ReconcileError::Marker(_) => ErrorKind::Infrastructure,
        }
    }
}

/// Why a candidate was left alone. Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyHandled,
    NotInArchive,
    NotInProgress(ArchiveStatus),
    NoClosedTask,
    CategoryMismatch {
        task: Category,
        document: Option<Category>,
    },
    NotFinalized(Option<TaskStatus>),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyHandled => f.write_str("already handled"),
            SkipReason::NotInArchive => f.write_str("not in archive"),
            SkipReason::NotInProgress(status) => write!(f, "archive status is {status:?}"),
            SkipReason::NoClosedTask => f.write_str("no closed task"),
            SkipReason::CategoryMismatch { task, document } => write!(
                f,
                "task category {task} differs from document category {}",
                document.as_ref().map_or("-", |c| c.code())
            ),
            SkipReason::NotFinalized(status) => write!(
                f,
                "closed task status is {}",
                status.as_ref().map_or("unknown", |s| s.as_str())
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// A follow-up task was created.
    Created(TaskTypeCode),
    /// An open task already existed; only the ledger marker was written.
    AlreadyOpen,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDoc {
    pub doc_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedDoc {
    pub doc_id: String,
    pub kind: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub handled: Vec<String>,
    pub skipped: Vec<SkippedDoc>,
    pub failed: Vec<FailedDoc>,
}

pub struct Reconciler {
    archive: Arc<dyn ArchiveApi>,
    tasks: Arc<dyn TaskApi>,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        archive: Arc<dyn ArchiveApi>,
        tasks: Arc<dyn TaskApi>,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            archive,
            tasks,
            ledger,
            clock,
        }
    }

    /// Process candidates in order. A failing candidate is reported and the
    /// sweep moves on.
    pub async fn sweep(&self, candidates: &[String]) -> SweepReport {
        let span = info_span!("sweep", x_request_id = %Ulid::new(), candidates = candidates.len());
        async {
            let mut report = SweepReport::default();
            for doc_id in candidates {
                match self.reconcile(doc_id).await {
                    Ok(Reconciled::Created(_) | Reconciled::AlreadyOpen) => {
                        report.handled.push(doc_id.clone())
                    }
                    Ok(Reconciled::Skipped(reason)) => report.skipped.push(SkippedDoc {
                        doc_id: doc_id.clone(),
                        reason: reason.to_string(),
                    }),
                    Err(err) => {
                        let message = mask_pii(&err.to_string()).into_owned();
                        error!(doc_id = %doc_id, error_kind = %err.kind(), error = %message, "reconciliation failed");
                        report.failed.push(FailedDoc {
                            doc_id: doc_id.clone(),
                            kind: err.kind().to_string(),
                            error: message,
                        });
                    }
                }
            }
            info!(
                handled = report.handled.len(),
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                "sweep finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    /// Reconcile one archived document.
    pub async fn reconcile(&self, doc_id: &str) -> Result<Reconciled, ReconcileError> {
        info!(doc_id, "checking document");

        if self.ledger.contains(doc_id).await? {
            return Ok(skip(doc_id, SkipReason::AlreadyHandled));
        }

        let Some(document) = self.archive.get_document(doc_id).await? else {
            return Ok(skip(doc_id, SkipReason::NotInArchive));
        };
        if !document.is_reconcilable() {
            return Ok(skip(doc_id, SkipReason::NotInProgress(document.archive_status)));
        }

        let Some(closed) = self.tasks.find_closed_task(doc_id).await? else {
            return Ok(skip(doc_id, SkipReason::NoClosedTask));
        };
        if document.category.as_ref() != Some(&closed.category) {
            return Ok(skip(
                doc_id,
                SkipReason::CategoryMismatch {
                    task: closed.category,
                    document: document.category,
                },
            ));
        }
        if closed.status != Some(TaskStatus::Finalized) {
            return Ok(skip(doc_id, SkipReason::NotFinalized(closed.status)));
        }

        if let Some(open) = self.tasks.find_open_task(doc_id).await? {
            warn!(doc_id, task_id = ?open.id, "open task already exists; recording marker only");
            self.ledger
                .record(doc_id, &serde_json::to_value(&open)?)
                .await?;
            return Ok(Reconciled::AlreadyOpen);
        }

        let follow_up = Task::new(
            follow_up_type(&closed),
            closed.assigned_unit.clone(),
            closed.description.clone(),
            closed.category.clone(),
            self.clock.today(),
        )
        .with_archive_doc_id(Some(doc_id.to_string()))
        .with_person_ref(closed.person_ref.clone());

        self.tasks.create_task(&follow_up).await?;
        self.ledger
            .record(doc_id, &serde_json::to_value(&follow_up)?)
            .await?;
        info!(doc_id, task_type = %follow_up.task_type_code, "follow-up task created");
        Ok(Reconciled::Created(follow_up.task_type_code))
    }
}

fn skip(doc_id: &str, reason: SkipReason) -> Reconciled {
    match &reason {
        SkipReason::CategoryMismatch { .. } => warn!(doc_id, %reason, "skipping document"),
        _ => info!(doc_id, %reason, "skipping document"),
    }
    Reconciled::Skipped(reason)
}

/// Outbound documents get an outbound routing task.
pub fn follow_up_type(closed: &Task) -> TaskTypeCode {
    if closed.task_type_code == TaskTypeCode::RoutingOut
        || closed.description.contains(OUTBOUND_MARKER)
    {
        TaskTypeCode::RoutingOut
    } else {
        TaskTypeCode::Routing
    }
}
