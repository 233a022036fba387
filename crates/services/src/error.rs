//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use vocab_core::model::UnitId;
use vocab_core::session::SessionOpError;

/// Errors emitted by content providers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("no content for unit {0}")]
    NotFound(UnitId),
    #[error("content for unit {unit} is malformed: {reason}")]
    Malformed { unit: UnitId, reason: String },
    #[error("content for unit {0} did not arrive in time")]
    Timeout(UnitId),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors emitted by `StudyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("unit {unit} does not exist (units run 1..={max})")]
    UnknownUnit { unit: u32, max: u32 },
    #[error("unit {0} is locked")]
    Locked(UnitId),
    #[error(transparent)]
    Session(#[from] SessionOpError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while wiring the engine from configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BootstrapError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
