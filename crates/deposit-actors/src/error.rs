//! # Design
//!
//! - Constant-message errors covering the lifecycle failure taxonomy.
//! - Soft failures (unsaved work, rejected metadata) are outcomes, not errors.

use std::time::Duration;

use deposit_core::{IngestError, QueueError, StoreError};
use thiserror::Error;

use crate::lock::LockError;

/// Result alias for actor operations.
pub type ActorResult<T> = Result<T, ActorError>;

/// Failures surfaced by [`FileSetActor`](crate::FileSetActor) operations.
#[derive(Debug, Error)]
pub enum ActorError {
    /// Saving or reloading a record failed.
    #[error("persistence failure")]
    Persistence {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Underlying store error.
        source: StoreError,
    },
    /// The per-work lock was not acquired within the configured bound.
    #[error("work lock timed out")]
    LockTimeout {
        /// Lock key that was contended.
        key: String,
        /// Time spent waiting.
        waited: Duration,
    },
    /// Synchronous ingestion failed.
    #[error("ingest failure")]
    Ingest {
        /// Underlying ingest error.
        #[from]
        source: IngestError,
    },
    /// A referenced record no longer exists.
    #[error("resource not found")]
    NotFound {
        /// Resource kind.
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// A deferred task could not be enqueued.
    #[error("task enqueue failed")]
    Queue {
        /// Underlying queue error.
        #[from]
        source: QueueError,
    },
    /// The operation needs a file set identifier that has not been assigned.
    #[error("file set not persisted")]
    Unsaved {
        /// Operation that required the identifier.
        operation: &'static str,
    },
}

impl ActorError {
    /// Map a store failure, promoting missing records to [`ActorError::NotFound`].
    pub(crate) fn lookup(operation: &'static str, source: StoreError) -> Self {
        match source {
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            source => Self::Persistence { operation, source },
        }
    }

    pub(crate) const fn persistence(operation: &'static str, source: StoreError) -> Self {
        Self::Persistence { operation, source }
    }
}

impl From<LockError> for ActorError {
    fn from(error: LockError) -> Self {
        match error {
            LockError::Timeout { key, waited } => Self::LockTimeout { key, waited },
        }
    }
}
