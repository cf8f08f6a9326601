//! Impls - ports の実装
//!
//! - HTTP: タスク API / アーカイブ（reqwest + retry）
//! - InMemory: 開発・テスト用（broker, task API, archive, ledger, dead-letter）
//! - Dir / Jsonl: ローカルファイルへの永続化

pub(crate) mod http;
pub mod dead_letter;
pub mod http_archive;
pub mod http_task;
pub mod inmem_source;
pub mod ledger;
pub mod memory_api;
pub mod retry;

pub use self::dead_letter::{InMemoryDeadLetterSink, JsonlDeadLetterSink};
pub use self::http::CORRELATION_HEADER;
pub use self::http_archive::HttpArchiveClient;
pub use self::http_task::HttpTaskClient;
pub use self::inmem_source::{InMemoryBroker, InMemoryPartitionSource};
pub use self::ledger::{DirLedger, InMemoryLedger};
pub use self::memory_api::{InMemoryArchive, InMemoryTaskApi};
pub use self::retry::RetryPolicy;
