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

//! Deposit service bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring and boot sequence), `error.rs`
//! (bootstrap failures).

/// Service wiring and boot sequence.
pub mod bootstrap;
/// Bootstrap failures.
pub mod error;

pub use bootstrap::{DepositApp, run_app};
pub use error::{AppError, AppResult};
