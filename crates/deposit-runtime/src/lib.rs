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

//! Persistence layer for works, file sets, content descriptors and versions.
//!
//! `MemoryStore` is the authoritative store: it validates records, enforces
//! optimistic versioning on works and cascades file set deletion into member
//! lists and stored content.

mod ability;
mod content;
mod store;

pub use ability::PermissionAbilityProvider;
pub use store::MemoryStore;
