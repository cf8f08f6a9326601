//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 設定からのワイヤリング（fail-fast）
//! - **EventProcessor**: 1 メッセージの処理（create / update）
//! - **ConsumerLane / LaneGroup**: パーティション単位の消費ループ
//! - **Reconciler**: アーカイブとタスク API の整合スイープ

pub mod builder;
pub mod lane;
pub mod processor;
pub mod reconcile;
pub mod status;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::lane::{ConsumerLane, FailureTracker, LaneGroup, LanePolicy};
pub use self::processor::{EventProcessor, Processed, TopicRoutes, task_for_event};
pub use self::reconcile::{
    FailedDoc, ReconcileError, Reconciled, Reconciler, SkipReason, SkippedDoc, SweepReport,
};
pub use self::status::{LaneExit, LaneReport, LaneStats};
