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

//! Repository-agnostic deposit model and collaborator interfaces.
//!
//! Layout: `model/` (works, file sets, descriptors, params, tasks), `service/`
//! (persistence, binary content, queue, ingest and authorization boundaries),
//! `callbacks.rs` (named lifecycle hooks), `error.rs` (boundary errors).

pub mod callbacks;
pub mod error;
pub mod model;
pub mod service;

pub use callbacks::{
    CallbackContext, CallbackEvent, CallbackHandler, CallbackRegistry, CallbackReport,
    CallbackSubject,
};
pub use error::{
    CallbackError, IngestError, IngestResult, QueueError, QueueResult, StoreError, StoreResult,
};
pub use model::{
    ContentDescriptor, ContentSource, ContentVersion, DescriptorId, Embargo, FieldError, FileSet,
    FileSetAttributes, FileSetId, FileSetParams, Lease, NewContentVersion, Permissions, Relation,
    Task, TaskHandle, User, ValidationErrors, Visibility, Work, WorkId,
};
pub use service::{
    Ability, AbilityProvider, BinaryStore, IngestStrategy, ResourceStore, TaskQueue,
};
