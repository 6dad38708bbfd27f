#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![allow(clippy::module_name_repetitions)]

//! Content ingestion and deferred task execution.
//!
//! - `strategy`: moves payload bytes into the binary store and reverts revisions.
//! - `runner`: executes one deferred task and reports its outcome on the event bus.
//! - `queue`: bounded worker queue with concurrency limits and retries.

pub mod error;
pub mod queue;
pub mod runner;
pub mod strategy;

pub use error::{JobError, JobResult};
pub use queue::{WorkerHandle, WorkerQueue};
pub use runner::JobRunner;
pub use strategy::FileIngestService;
