//! tasklane-core
//!
//! Turns task-creation and task-update events into calls against an external
//! task API, and repairs documents whose follow-up task went missing.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（events, tasks, archived documents, errors）
//! - **description**: event → task type code + description（純粋関数）
//! - **ports**: 抽象化レイヤー（TaskApi, ArchiveApi, Ledger, EventSource, DeadLetterSink, Clock）
//! - **impls**: 実装（HTTP クライアント、InMemory、ファイル永続化）
//! - **app**: アプリケーションロジック（processor, lane, reconcile, builder）
//! - **config**: TOML 設定
//! - **redact**: ログ出力前の PII マスク

pub mod app;
pub mod config;
pub mod description;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod redact;
