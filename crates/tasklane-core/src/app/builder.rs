//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - build() で設定を検証してからクライアントを組み立てる
//! - 不正な URL や retry 設定は起動時に BuildError になる
//! - テストでは各 port を差し替えられる（`with_*`）

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::lane::{ConsumerLane, FailureTracker, LaneGroup, LanePolicy};
use super::processor::EventProcessor;
use super::reconcile::{Reconciler, SweepReport};
use crate::config::{AppConfig, ConfigError, LedgerConfig};
use crate::domain::ClientError;
use crate::impls::{
    DirLedger, HttpArchiveClient, HttpTaskClient, InMemoryLedger, JsonlDeadLetterSink,
};
use crate::ports::{
    ArchiveApi, Clock, DeadLetterSink, EnvTokenProvider, EventSource, Ledger, SystemClock,
    TaskApi,
};

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("client setup failed: {0}")]
    Client(#[from] ClientError),
}

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(config).build()?;
/// let group = app.spawn_lanes(sources);
/// ```
pub struct AppBuilder {
    config: AppConfig,
    clock: Option<Arc<dyn Clock>>,
    task_api: Option<Arc<dyn TaskApi>>,
    archive: Option<Arc<dyn ArchiveApi>>,
    ledger: Option<Arc<dyn Ledger>>,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
}

impl AppBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            clock: None,
            task_api: None,
            archive: None,
            ledger: None,
            dead_letters: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_task_api(mut self, task_api: Arc<dyn TaskApi>) -> Self {
        self.task_api = Some(task_api);
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn ArchiveApi>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_dead_letters(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letters = Some(sink);
        self
    }

    /// 設定を検証して App を生成
    pub fn build(self) -> Result<App, BuildError> {
        let config = self.config;
        config.validate()?;

        let retry = config.retry_policy();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let task_api: Arc<dyn TaskApi> = match self.task_api {
            Some(api) => api,
            None => Arc::new(HttpTaskClient::new(
                &config.task_api.base_url,
                Arc::new(EnvTokenProvider::new(&config.task_api.token_env)),
                retry.clone(),
                Duration::from_secs(config.task_api.timeout_secs),
            )?),
        };

        let archive: Arc<dyn ArchiveApi> = match self.archive {
            Some(archive) => archive,
            None => Arc::new(HttpArchiveClient::new(
                &config.archive_api.endpoint,
                Arc::new(EnvTokenProvider::new(&config.archive_api.token_env)),
                retry,
                Duration::from_secs(config.archive_api.timeout_secs),
            )?),
        };

        let ledger: Arc<dyn Ledger> = match (self.ledger, &config.ledger) {
            (Some(ledger), _) => ledger,
            (None, LedgerConfig::Memory) => Arc::new(InMemoryLedger::new()),
            (None, LedgerConfig::Dir { path }) => Arc::new(DirLedger::new(path)),
        };

        let dead_letters: Option<Arc<dyn DeadLetterSink>> = match self.dead_letters {
            Some(sink) => Some(sink),
            None => config
                .consumer
                .dead_letter_path
                .as_ref()
                .map(|path| Arc::new(JsonlDeadLetterSink::new(path)) as Arc<dyn DeadLetterSink>),
        };

        let processor = Arc::new(EventProcessor::new(
            Arc::clone(&task_api),
            Arc::clone(&clock),
            config.consumer.routes(),
        ));
        let reconciler = Reconciler::new(archive, task_api, ledger, Arc::clone(&clock));

        Ok(App {
            lane_policy: Arc::new(config.lane_policy()),
            config,
            processor,
            reconciler,
            dead_letters,
            failures: FailureTracker::new(),
            clock,
        })
    }
}

/// App は組み立て済みのアプリケーション
pub struct App {
    config: AppConfig,
    processor: Arc<EventProcessor>,
    reconciler: Reconciler,
    lane_policy: Arc<LanePolicy>,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
    failures: FailureTracker,
    clock: Arc<dyn Clock>,
}

impl App {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn processor(&self) -> &Arc<EventProcessor> {
        &self.processor
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// A lane for one partition, wired with the configured policy.
    pub fn lane(&self, source: Arc<dyn EventSource>) -> ConsumerLane {
        let lane = ConsumerLane::new(
            source,
            Arc::clone(&self.processor),
            Arc::clone(&self.lane_policy),
            Arc::clone(&self.clock),
        )
        .with_failure_tracker(self.failures.clone());
        match &self.dead_letters {
            Some(sink) => lane.with_dead_letters(Arc::clone(sink)),
            None => lane,
        }
    }

    pub fn spawn_lanes(&self, sources: Vec<Arc<dyn EventSource>>) -> LaneGroup {
        LaneGroup::spawn(sources.into_iter().map(|s| self.lane(s)).collect())
    }

    /// Sweep over the candidates listed in the configuration.
    pub async fn reconcile_configured(&self) -> SweepReport {
        self.reconciler
            .sweep(&self.config.reconciliation.candidates)
            .await
    }
}
