//! InMemoryBroker - 開発・テスト用のパーティション付きログ
//!
//! # 実装詳細
//! - パーティションごとに `Vec<ConsumerRecord>` と committed index を保持
//! - tokio Mutex + Notify（publish / close で待機中の poll を起こす）
//! - `poll` は committed 位置のレコードを返す。ack されなければ同じレコードが
//!   再配送される（at-least-once）

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::ports::{ConsumerRecord, Delivery, EventSource, Position, SourceError};

#[derive(Default)]
struct PartitionState {
    records: Vec<ConsumerRecord>,
    /// Index of the next record to deliver; everything before it is committed.
    committed: usize,
    closed: bool,
}

#[derive(Default)]
struct Partition {
    state: Mutex<PartitionState>,
    notify: Notify,
}

/// In-memory broker holding any number of topic partitions.
#[derive(Default)]
pub struct InMemoryBroker {
    partitions: Mutex<BTreeMap<(String, i32), Arc<Partition>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    async fn partition_handle(&self, topic: &str, partition: i32) -> Arc<Partition> {
        let mut partitions = self.partitions.lock().await;
        Arc::clone(
            partitions
                .entry((topic.to_string(), partition))
                .or_default(),
        )
    }

    /// Append a payload; the offset follows the partition's last offset.
    pub async fn publish(
        &self,
        topic: &str,
        partition: i32,
        payload: impl Into<String>,
    ) -> Result<Position, SourceError> {
        let handle = self.partition_handle(topic, partition).await;
        let offset = {
            let state = handle.state.lock().await;
            state.records.last().map_or(0, |r| r.offset + 1)
        };
        self.publish_record(ConsumerRecord {
            topic: topic.to_string(),
            partition,
            offset,
            key: None,
            payload: payload.into(),
        })
        .await
    }

    /// Append a record with its own offset (replaying an export).
    /// Offsets within a partition must be strictly increasing.
    pub async fn publish_record(&self, record: ConsumerRecord) -> Result<Position, SourceError> {
        let handle = self.partition_handle(&record.topic, record.partition).await;
        let position = record.position();
        {
            let mut state = handle.state.lock().await;
            if state.closed {
                return Err(SourceError::Closed);
            }
            if let Some(last) = state.records.last()
                && last.offset >= record.offset
            {
                return Err(SourceError::Other(format!(
                    "offset {} is not after {} on {}-{}",
                    record.offset, last.offset, record.topic, record.partition
                )));
            }
            state.records.push(record);
        }
        handle.notify.notify_one();
        Ok(position)
    }

    /// No more records will be published; polls return `None` once drained.
    pub async fn close(&self) {
        let partitions = self.partitions.lock().await;
        for partition in partitions.values() {
            partition.state.lock().await.closed = true;
            partition.notify.notify_one();
        }
    }

    /// Source for one partition (created empty if unknown).
    pub async fn source(&self, topic: &str, partition: i32) -> InMemoryPartitionSource {
        InMemoryPartitionSource {
            topic: topic.to_string(),
            partition,
            inner: self.partition_handle(topic, partition).await,
        }
    }

    /// Sources for every partition published to so far, ordered by topic/partition.
    pub async fn sources(&self) -> Vec<InMemoryPartitionSource> {
        let partitions = self.partitions.lock().await;
        partitions
            .iter()
            .map(|((topic, partition), inner)| InMemoryPartitionSource {
                topic: topic.clone(),
                partition: *partition,
                inner: Arc::clone(inner),
            })
            .collect()
    }

    /// Offset of the next record to be delivered (Kafka-style committed offset).
    /// `None` until something was acknowledged.
    pub async fn committed(&self, topic: &str, partition: i32) -> Option<i64> {
        let handle = {
            let partitions = self.partitions.lock().await;
            Arc::clone(partitions.get(&(topic.to_string(), partition))?)
        };
        let state = handle.state.lock().await;
        if state.committed == 0 {
            return None;
        }
        Some(state.records[state.committed - 1].offset + 1)
    }
}

/// One partition of an [`InMemoryBroker`].
pub struct InMemoryPartitionSource {
    topic: String,
    partition: i32,
    inner: Arc<Partition>,
}

#[async_trait]
impl EventSource for InMemoryPartitionSource {
    fn name(&self) -> String {
        format!("{}-{}", self.topic, self.partition)
    }

    async fn poll(&self) -> Result<Option<Box<dyn Delivery>>, SourceError> {
        loop {
            {
                let state = self.inner.state.lock().await;
                if let Some(record) = state.records.get(state.committed) {
                    return Ok(Some(Box::new(InMemoryDelivery {
                        record: record.clone(),
                        index: state.committed,
                        partition: Arc::clone(&self.inner),
                    })));
                }
                if state.closed {
                    return Ok(None);
                }
            }
            // publish/close は notify_one なので、待機前の通知も permit として残る
            self.inner.notify.notified().await;
        }
    }
}

struct InMemoryDelivery {
    record: ConsumerRecord,
    index: usize,
    partition: Arc<Partition>,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn record(&self) -> &ConsumerRecord {
        &self.record
    }

    async fn ack(self: Box<Self>) -> Result<(), SourceError> {
        let mut state = self.partition.state.lock().await;
        if self.index < state.committed {
            // already committed by an earlier delivery of the same record
            return Ok(());
        }
        if self.index > state.committed {
            return Err(SourceError::Commit {
                position: self.record.position(),
                message: "earlier records are not acknowledged".into(),
            });
        }
        state.committed += 1;
        Ok(())
    }
}
