//! # Design
//!
//! - Constant-message errors for deferred task execution.
//! - Preserve the boundary error that caused the failure as `source`.

use deposit_core::{IngestError, StoreError};
use thiserror::Error;

/// Result type for deferred task execution.
pub type JobResult<T> = Result<T, JobError>;

/// Errors produced while running a deferred task.
#[derive(Debug, Error)]
pub enum JobError {
    /// Loading or saving a record failed.
    #[error("task store failure")]
    Store {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Underlying store error.
        source: StoreError,
    },
    /// The ingest strategy failed.
    #[error("task ingest failure")]
    Ingest {
        /// Underlying ingest error.
        #[from]
        source: IngestError,
    },
}

impl JobError {
    pub(crate) const fn store(operation: &'static str, source: StoreError) -> Self {
        Self::Store { operation, source }
    }
}
