//! Durable run state
//!
//! The run-state snapshot says what to ask next; the project document says
//! what has been built. They are written separately and may disagree after a
//! crash, which resume tolerates.

mod snapshot;
pub mod storage;

pub use snapshot::{RunState, TranscriptEntry};
pub use storage::{FileStorage, ProjectFile, Storage, StorageError, StoragePaths};
