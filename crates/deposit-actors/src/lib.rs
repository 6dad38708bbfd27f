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

//! File set lifecycle actors.
//!
//! A [`FileSetActor`] pairs one file set with the acting user and drives the
//! deposit lifecycle: content ingest, metadata, attachment to a parent work
//! under a per-work lock, and teardown.
//!
//! Layout: `actor/` (the four lifecycle concerns), `lock.rs` (per-key async
//! locks with a bounded wait), `wrapper.rs` (labels and content descriptors),
//! `visibility.rs` (explicit visibility, embargo and lease assignment).

mod actor;
pub mod error;
pub mod lock;
pub mod visibility;
pub mod wrapper;

pub use actor::{ActorServices, AttachOutcome, ContentOutcome, FileSetActor, MetadataOutcome};
pub use error::{ActorError, ActorResult};
pub use lock::{LockError, LockGuard, LockManager, LockResult, work_key};
pub use wrapper::ContentWrapper;
