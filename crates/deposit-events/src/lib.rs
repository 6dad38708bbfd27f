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

//! Notification bus for deposit lifecycle outcomes.
//!
//! Asynchronous work (ingest, permission propagation) finishes after the call
//! that scheduled it has returned; its outcome reaches users through this bus.
//! The bus keeps sequential identifiers and a bounded replay ring so
//! reconnecting subscribers can resume from the last id they saw.

pub mod payloads;
pub mod routing;

pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
pub use routing::{EventBus, EventStream};
