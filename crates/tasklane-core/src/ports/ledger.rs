//! Ledger port - 冪等性マーカー（docId → marker）
//!
//! Existence of a key means "already reconciled". The marker value is an
//! opaque JSON snapshot kept for operators.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid ledger key {0:?}")]
    InvalidKey(String),

    #[error("ledger storage failed for {key}: {message}")]
    Storage { key: String, message: String },
}

/// # 設計原則
/// - read-before-write per key; no cross-key transactions
/// - `record` is only called after the follow-up task was created
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn contains(&self, doc_id: &str) -> Result<bool, LedgerError>;

    async fn record(&self, doc_id: &str, marker: &serde_json::Value) -> Result<(), LedgerError>;
}
