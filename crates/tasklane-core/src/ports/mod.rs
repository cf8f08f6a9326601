//! Ports - 抽象化レイヤー
//!
//! Each trait is the seam to one external system (broker, task API, archive,
//! ledger storage, dead-letter storage, token issuer, clock). Implementations
//! live in [`crate::impls`].

pub mod archive;
pub mod clock;
pub mod dead_letter;
pub mod event_source;
pub mod ledger;
pub mod task_api;
pub mod token;

pub use self::archive::ArchiveApi;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::dead_letter::{DeadLetter, DeadLetterError, DeadLetterSink};
pub use self::event_source::{ConsumerRecord, Delivery, EventSource, Position, SourceError};
pub use self::ledger::{Ledger, LedgerError};
pub use self::task_api::TaskApi;
pub use self::token::{EnvTokenProvider, StaticTokenProvider, TokenProvider};
