//! EventSource port - メッセージ配送（1 パーティション = 1 レーン）
//!
//! The physical broker client (group membership, partition assignment) lives
//! outside this crate. A lane sees one ordered stream of records and must
//! either `ack` a delivery or drop it; dropping leaves the committed position
//! where it was, so the record is delivered again after a restart.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source closed")]
    Closed,

    #[error("commit failed at {position}: {message}")]
    Commit { position: Position, message: String },

    #[error("{0}")]
    Other(String),
}

/// Topic / partition / offset of one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl Position {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}@{}", self.topic, self.partition, self.offset)
    }
}

/// A record as handed over by the broker client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    #[serde(default)]
    pub key: Option<String>,
    pub payload: String,
}

impl ConsumerRecord {
    pub fn position(&self) -> Position {
        Position::new(self.topic.clone(), self.partition, self.offset)
    }
}

/// A delivered record. The lane owns it and must `ack` it or drop it.
#[async_trait]
pub trait Delivery: Send {
    fn record(&self) -> &ConsumerRecord;

    /// Advance the committed position past this record.
    async fn ack(self: Box<Self>) -> Result<(), SourceError>;
}

/// One partition's ordered stream.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Human-readable lane name for logs (`topic-partition`).
    fn name(&self) -> String;

    /// Next record after the committed position. Waits for new records;
    /// `Ok(None)` means the source is closed and fully consumed.
    async fn poll(&self) -> Result<Option<Box<dyn Delivery>>, SourceError>;
}
