//! Domain model (events, tasks, archived documents, errors).
//!
//! Pure data: nothing in here performs I/O.

pub mod document;
pub mod errors;
pub mod event;
pub mod sed;
pub mod task;

pub use self::document::{ArchiveStatus, ArchivedDocument};
pub use self::errors::{ClientError, ErrorKind, ProcessError};
pub use self::event::{Category, EventDirection, TaskKind, TaskRequestEvent, TaskUpdateEvent};
pub use self::sed::SedType;
pub use self::task::{
    CREATING_UNIT, Priority, StatusBucket, Task, TaskId, TaskPage, TaskPatch, TaskStatus,
    TaskTypeCode,
};
