//! Error types raised at the collaborator boundaries.
//!
//! # Design
//!
//! - Constant error messages; identifiers and operations travel as fields.
//! - Preserve source errors without interpolating context into messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::{DescriptorId, FileSetId, Relation, ValidationErrors};

/// Result alias for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced record does not exist (or was concurrently deleted).
    #[error("resource not found")]
    NotFound {
        /// Resource kind (`work`, `file_set`, `descriptor`, `content`).
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// Record failed validation and was not written.
    #[error("resource failed validation")]
    Invalid {
        /// Resource kind.
        kind: &'static str,
        /// Collected validation failures.
        errors: ValidationErrors,
    },
    /// Write was based on an outdated copy of the record.
    #[error("stale resource version")]
    Stale {
        /// Identifier of the record.
        id: String,
        /// Version carried by the write.
        expected: u64,
        /// Version currently stored.
        found: u64,
    },
    /// Backend could not service the request.
    #[error("store unavailable")]
    Unavailable {
        /// Operation identifier.
        operation: &'static str,
        /// Backend-supplied detail.
        detail: String,
    },
}

impl StoreError {
    /// Construct a not-found error for a resource kind and identifier.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether the error reports a missing record.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Failures reported by the task queue boundary.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Queue no longer accepts work.
    #[error("task queue closed")]
    Closed {
        /// Kind of the rejected task.
        kind: &'static str,
    },
    /// Queue is at capacity.
    #[error("task queue full")]
    Full {
        /// Kind of the rejected task.
        kind: &'static str,
    },
}

/// Result alias for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Failures reported by the ingest strategy.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Payload bytes are not reachable from this host.
    #[error("content source unavailable")]
    SourceUnavailable {
        /// Descriptor whose payload could not be located.
        descriptor_id: DescriptorId,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// Reading the payload failed.
    #[error("content io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Requested revision does not exist for the relation.
    #[error("revision not found")]
    RevisionNotFound {
        /// File set being reverted.
        file_set_id: FileSetId,
        /// Relation being reverted.
        relation: Relation,
        /// Revision that was requested.
        revision_id: String,
    },
    /// Persistence failed while recording content.
    #[error("content store failure")]
    Store {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying store error.
        source: StoreError,
    },
}

/// Failure returned by a lifecycle callback handler.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// Handler reported a failure.
    #[error("callback handler failed")]
    Failed {
        /// Event the handler was registered for.
        event: &'static str,
        /// Handler-supplied detail.
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_constant_messages() {
        let err = StoreError::not_found("work", "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "resource not found");

        let stale = StoreError::Stale {
            id: "abc".into(),
            expected: 1,
            found: 2,
        };
        assert!(!stale.is_not_found());
        assert_eq!(stale.to_string(), "stale resource version");
    }

    #[test]
    fn ingest_io_error_exposes_source() {
        use std::error::Error as _;
        let err = IngestError::Io {
            operation: "read_payload",
            path: PathBuf::from("/missing"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "content io failure");
    }
}
