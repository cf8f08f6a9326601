//! DeadLetterSink port - 処理不能メッセージの退避先
//!
//! Replaces hard-coded poison offsets: a record that keeps failing is written
//! here together with the last error, and only then acknowledged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::event_source::ConsumerRecord;
use crate::domain::ErrorKind;

#[derive(Debug, Error)]
#[error("dead-letter write failed: {0}")]
pub struct DeadLetterError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub record: ConsumerRecord,
    pub error_kind: String,
    /// Already masked.
    pub error: String,
    pub failures: u32,
    pub dead_lettered_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(
        record: ConsumerRecord,
        kind: ErrorKind,
        error: impl Into<String>,
        failures: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            record,
            error_kind: kind.to_string(),
            error: error.into(),
            failures,
            dead_lettered_at: at,
        }
    }
}

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn send(&self, letter: DeadLetter) -> Result<(), DeadLetterError>;
}
