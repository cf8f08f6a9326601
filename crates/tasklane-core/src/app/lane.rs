//! ConsumerLane - パーティション単位の消費ループ
//!
//! # 配送規律
//! - 1 レーン = 1 パーティション。メッセージは 1 件ずつ最後まで処理する
//! - ack は処理成功の後だけ
//! - 失敗したら ack せずに停止（fail-stop）。再開は外部（supervisor / operator）
//!
//! # 例外
//! - 設定された skip 位置は処理せずに ack
//! - `dead_letter_after` 回失敗したレコードは dead-letter に退避してから ack

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};
use ulid::Ulid;

use super::processor::EventProcessor;
use super::status::{LaneExit, LaneReport, LaneStats};
use crate::domain::ProcessError;
use crate::ports::{Clock, DeadLetter, DeadLetterSink, Delivery, EventSource, Position};
use crate::redact::{Masked, mask_pii};

/// Escape hatches for records that keep failing.
#[derive(Debug, Clone, Default)]
pub struct LanePolicy {
    /// Positions acknowledged without processing.
    pub skip_positions: HashSet<Position>,

    /// Dead-letter a record after this many failures. `None` always halts.
    pub dead_letter_after: Option<u32>,
}

/// Failure counts per position, shared across lane restarts.
#[derive(Clone, Default)]
pub struct FailureTracker {
    counts: Arc<Mutex<HashMap<Position, u32>>>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record_failure(&self, position: &Position) -> u32 {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(position.clone()).or_insert(0);
        *count += 1;
        *count
    }

    async fn clear(&self, position: &Position) {
        self.counts.lock().await.remove(position);
    }

    pub async fn failures(&self, position: &Position) -> u32 {
        self.counts.lock().await.get(position).copied().unwrap_or(0)
    }
}

pub struct ConsumerLane {
    source: Arc<dyn EventSource>,
    processor: Arc<EventProcessor>,
    policy: Arc<LanePolicy>,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
    failures: FailureTracker,
    clock: Arc<dyn Clock>,
}

impl ConsumerLane {
    pub fn new(
        source: Arc<dyn EventSource>,
        processor: Arc<EventProcessor>,
        policy: Arc<LanePolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            processor,
            policy,
            dead_letters: None,
            failures: FailureTracker::new(),
            clock,
        }
    }

    pub fn with_dead_letters(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letters = Some(sink);
        self
    }

    pub fn with_failure_tracker(mut self, failures: FailureTracker) -> Self {
        self.failures = failures;
        self
    }

    pub fn name(&self) -> String {
        self.source.name()
    }

    /// Consume until the source drains, a record fails, or shutdown is requested.
    ///
    /// Can be called again after a halt; the failed record is then delivered again.
    pub async fn run(&self, shutdown: &mut watch::Receiver<bool>) -> LaneReport {
        let lane = self.source.name();
        let mut stats = LaneStats::default();
        info!(%lane, "lane started");

        let exit = loop {
            if *shutdown.borrow() {
                break LaneExit::Shutdown;
            }

            // poll は待つ可能性があるので shutdown と競合させる
            let polled = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break LaneExit::Shutdown;
                    }
                    continue;
                }
                polled = self.source.poll() => polled,
            };

            let delivery = match polled {
                Ok(Some(delivery)) => delivery,
                Ok(None) => break LaneExit::Drained,
                Err(err) => {
                    error!(%lane, error = %err, "poll failed");
                    break LaneExit::SourceFailed {
                        error: err.to_string(),
                    };
                }
            };

            let record = delivery.record();
            let span = info_span!(
                "message",
                %lane,
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                x_request_id = %Ulid::new(),
            );
            if let ControlFlow::Break(exit) = self.handle(delivery, &mut stats).instrument(span).await
            {
                break exit;
            }
        };

        match &exit {
            LaneExit::Halted { position, .. } => {
                error!(%lane, %position, "lane halted; restart required")
            }
            _ => info!(%lane, summary = %stats_line(&stats), "lane stopped"),
        }
        LaneReport { lane, exit, stats }
    }

    async fn handle(
        &self,
        delivery: Box<dyn Delivery>,
        stats: &mut LaneStats,
    ) -> ControlFlow<LaneExit> {
        let record = delivery.record().clone();
        let position = record.position();

        if self.policy.skip_positions.contains(&position) {
            warn!(%position, "position is on the skip list; acknowledging without processing");
            ack(delivery).await?;
            stats.skipped += 1;
            return ControlFlow::Continue(());
        }

        match self.processor.process(&record).await {
            Ok(processed) => {
                ack(delivery).await?;
                self.failures.clear(&position).await;
                stats.processed += 1;
                info!(?processed, "record processed");
                ControlFlow::Continue(())
            }
            Err(err) => {
                let failures = self.failures.record_failure(&position).await;
                error!(
                    error_kind = %err.kind(),
                    error = %Masked(err.message()),
                    payload = %Masked(&record.payload),
                    failures,
                    "processing failed"
                );

                let Some(sink) = self.dead_letter_sink(failures) else {
                    // ack しない: delivery を drop すると committed 位置はそのまま
                    return ControlFlow::Break(LaneExit::Halted {
                        position,
                        error: err,
                    });
                };

                let letter = DeadLetter::new(
                    record,
                    err.kind(),
                    mask_pii(err.message()),
                    failures,
                    self.clock.now(),
                );
                if let Err(dl_err) = sink.send(letter).await {
                    error!(error = %dl_err, "dead-letter write failed");
                    return ControlFlow::Break(LaneExit::Halted {
                        position,
                        error: ProcessError::infrastructure(dl_err.to_string()),
                    });
                }
                ack(delivery).await?;
                self.failures.clear(&position).await;
                stats.dead_lettered += 1;
                warn!(%position, failures, "record dead-lettered; lane continues");
                ControlFlow::Continue(())
            }
        }
    }

    fn dead_letter_sink(&self, failures: u32) -> Option<&Arc<dyn DeadLetterSink>> {
        let threshold = self.policy.dead_letter_after?;
        if failures >= threshold {
            self.dead_letters.as_ref()
        } else {
            None
        }
    }
}

async fn ack(delivery: Box<dyn Delivery>) -> ControlFlow<LaneExit> {
    match delivery.ack().await {
        Ok(()) => ControlFlow::Continue(()),
        Err(err) => {
            error!(error = %err, "ack failed");
            ControlFlow::Break(LaneExit::SourceFailed {
                error: err.to_string(),
            })
        }
    }
}

fn stats_line(stats: &LaneStats) -> String {
    format!(
        "processed={} skipped={} dead_lettered={}",
        stats.processed, stats.skipped, stats.dead_lettered
    )
}

/// Lane group handle.
/// - `request_shutdown()` で全レーンに停止を要求（処理中のメッセージは最後まで）
/// - `join()` で全レーンの [`LaneReport`] を回収
pub struct LaneGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<LaneReport>>,
}

impl LaneGroup {
    /// Spawn one tokio task per lane.
    pub fn spawn(lanes: Vec<ConsumerLane>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let joins = lanes
            .into_iter()
            .map(|lane| {
                let mut rx = shutdown_rx.clone();
                tokio::spawn(async move { lane.run(&mut rx).await })
            })
            .collect();

        Self { shutdown_tx, joins }
    }

    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for every lane to stop on its own.
    pub async fn join(self) -> Vec<LaneReport> {
        let mut reports = Vec::with_capacity(self.joins.len());
        for join in self.joins {
            match join.await {
                Ok(report) => reports.push(report),
                Err(err) => error!(error = %err, "lane task panicked"),
            }
        }
        reports
    }

    pub async fn shutdown_and_join(self) -> Vec<LaneReport> {
        self.request_shutdown();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::processor::TopicRoutes;
    use crate::domain::ErrorKind;
    use crate::impls::{InMemoryBroker, InMemoryDeadLetterSink, InMemoryTaskApi};
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tracing_test::traced_test;

    const CREATE: &str = "task-create";

    fn good(case_id: &str) -> String {
        format!(
            r#"{{"sedCode":"P2000","assignedUnit":"4303","taskKind":"GENERAL",
                "caseId":"{case_id}","eventDirection":"RECEIVED"}}"#
        )
    }

    // decodes, but REVIEW_DOCUMENT without archive id and attachment fails
    const BAD: &str = r#"{"sedCode":"P2000","assignedUnit":"4303","taskKind":"REVIEW_DOCUMENT",
        "caseId":"1","eventDirection":"RECEIVED","personRef":"12345678901"}"#;

    struct Fixture {
        broker: Arc<InMemoryBroker>,
        api: Arc<InMemoryTaskApi>,
        processor: Arc<EventProcessor>,
        clock: Arc<dyn Clock>,
    }

    impl Fixture {
        fn new() -> Self {
            let api = Arc::new(InMemoryTaskApi::new());
            let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            ));
            let processor = Arc::new(EventProcessor::new(
                api.clone(),
                clock.clone(),
                TopicRoutes::default(),
            ));
            Self {
                broker: Arc::new(InMemoryBroker::new()),
                api,
                processor,
                clock,
            }
        }

        async fn lane(&self, policy: LanePolicy) -> ConsumerLane {
            let source = Arc::new(self.broker.source(CREATE, 0).await);
            ConsumerLane::new(
                source,
                self.processor.clone(),
                Arc::new(policy),
                self.clock.clone(),
            )
        }
    }

    fn shutdown_rx() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn drains_and_commits_successful_records() {
        let fx = Fixture::new();
        fx.broker.publish(CREATE, 0, good("1")).await.unwrap();
        fx.broker.publish(CREATE, 0, good("2")).await.unwrap();
        fx.broker.close().await;

        let (_tx, mut rx) = shutdown_rx();
        let report = fx.lane(LanePolicy::default()).await.run(&mut rx).await;

        assert!(matches!(report.exit, LaneExit::Drained));
        assert_eq!(report.stats.processed, 2);
        assert_eq!(fx.broker.committed(CREATE, 0).await, Some(2));
        assert_eq!(fx.api.created().await.len(), 2);
    }

    #[tokio::test]
    async fn failure_halts_without_ack_and_leaves_next_record() {
        let fx = Fixture::new();
        fx.broker.publish(CREATE, 0, BAD).await.unwrap();
        fx.broker.publish(CREATE, 0, good("2")).await.unwrap();
        fx.broker.close().await;

        let lane = fx.lane(LanePolicy::default()).await;
        let (_tx, mut rx) = shutdown_rx();
        let report = lane.run(&mut rx).await;

        match report.exit {
            LaneExit::Halted { position, error } => {
                assert_eq!(position, Position::new(CREATE, 0, 0));
                assert_eq!(error.kind(), ErrorKind::Input);
            }
            other => panic!("unexpected exit: {other:?}"),
        }
        assert_eq!(fx.broker.committed(CREATE, 0).await, None);
        assert!(fx.api.created().await.is_empty());

        // restart: the same record comes back and halts again
        let again = lane.run(&mut rx).await;
        assert!(again.exit.is_halted());
        assert!(fx.api.created().await.is_empty());
    }

    #[tokio::test]
    async fn skip_list_acknowledges_without_processing() {
        let fx = Fixture::new();
        fx.broker.publish(CREATE, 0, BAD).await.unwrap();
        fx.broker.publish(CREATE, 0, good("2")).await.unwrap();
        fx.broker.close().await;

        let policy = LanePolicy {
            skip_positions: HashSet::from([Position::new(CREATE, 0, 0)]),
            dead_letter_after: None,
        };
        let (_tx, mut rx) = shutdown_rx();
        let report = fx.lane(policy).await.run(&mut rx).await;

        assert!(matches!(report.exit, LaneExit::Drained));
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.processed, 1);
        assert_eq!(fx.api.created().await.len(), 1);
    }

    #[tokio::test]
    async fn dead_letters_after_repeated_failures() {
        let fx = Fixture::new();
        fx.broker.publish(CREATE, 0, BAD).await.unwrap();
        fx.broker.publish(CREATE, 0, good("2")).await.unwrap();
        fx.broker.close().await;

        let sink = Arc::new(InMemoryDeadLetterSink::new());
        let policy = LanePolicy {
            skip_positions: HashSet::new(),
            dead_letter_after: Some(2),
        };
        let lane = fx.lane(policy).await.with_dead_letters(sink.clone());
        let (_tx, mut rx) = shutdown_rx();

        let first = lane.run(&mut rx).await;
        assert!(first.exit.is_halted());
        assert!(sink.letters().await.is_empty());

        let second = lane.run(&mut rx).await;
        assert!(matches!(second.exit, LaneExit::Drained));
        assert_eq!(second.stats.dead_lettered, 1);
        assert_eq!(second.stats.processed, 1);

        let letters = sink.letters().await;
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].failures, 2);
        assert_eq!(letters[0].record.offset, 0);
        assert_eq!(letters[0].error_kind, "input");
        assert_eq!(fx.broker.committed(CREATE, 0).await, Some(2));
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_payload_is_logged_masked() {
        let fx = Fixture::new();
        fx.broker.publish(CREATE, 0, BAD).await.unwrap();
        fx.broker.close().await;

        let (_tx, mut rx) = shutdown_rx();
        fx.lane(LanePolicy::default()).await.run(&mut rx).await;

        assert!(logs_contain("processing failed"));
        assert!(logs_contain("***********"));
        assert!(logs_contain("x_request_id"));
        assert!(!logs_contain("12345678901"));
    }

    #[tokio::test]
    async fn unlisted_sed_code_does_not_halt_lane() {
        let fx = Fixture::new();
        let mismatch = r#"{"sedCode":"P3000_SE","assignedUnit":"4303","taskKind":"IDENTITY_MISMATCH",
            "caseId":"148161","eventDirection":"RECEIVED"}"#;
        fx.broker.publish(CREATE, 0, mismatch).await.unwrap();
        fx.broker.close().await;

        let (_tx, mut rx) = shutdown_rx();
        let report = fx.lane(LanePolicy::default()).await.run(&mut rx).await;

        assert!(matches!(report.exit, LaneExit::Drained));
        assert_eq!(report.stats.processed, 1);
        assert_eq!(fx.broker.committed(CREATE, 0).await, Some(1));
    }

    #[tokio::test]
    async fn group_shutdown_stops_idle_lanes() {
        let fx = Fixture::new();
        let lanes = vec![
            fx.lane(LanePolicy::default()).await,
            ConsumerLane::new(
                Arc::new(fx.broker.source(CREATE, 1).await),
                fx.processor.clone(),
                Arc::new(LanePolicy::default()),
                fx.clock.clone(),
            ),
        ];
        let group = LaneGroup::spawn(lanes);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let reports = group.shutdown_and_join().await;
        assert_eq!(reports.len(), 2);
        assert!(
            reports
                .iter()
                .all(|r| matches!(r.exit, LaneExit::Shutdown))
        );
    }

    #[tokio::test]
    async fn group_join_collects_drained_partitions() {
        let fx = Fixture::new();
        fx.broker.publish(CREATE, 0, good("1")).await.unwrap();
        fx.broker.publish(CREATE, 1, good("2")).await.unwrap();
        fx.broker.publish(CREATE, 1, good("3")).await.unwrap();
        fx.broker.close().await;

        let lanes = fx
            .broker
            .sources()
            .await
            .into_iter()
            .map(|source| {
                ConsumerLane::new(
                    Arc::new(source),
                    fx.processor.clone(),
                    Arc::new(LanePolicy::default()),
                    fx.clock.clone(),
                )
            })
            .collect();
        let reports = LaneGroup::spawn(lanes).join().await;

        let processed: usize = reports.iter().map(|r| r.stats.processed).sum();
        assert_eq!(processed, 3);
        assert_eq!(fx.api.created().await.len(), 3);
    }
}
