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

//! Typed runtime configuration for the deposit services.
//!
//! Layout: `model.rs` (typed sections), `defaults.rs` (default values),
//! `loader.rs` (defaults → JSON file → environment overrides),
//! `validate.rs` (range checks), `error.rs` (failure taxonomy).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_PATH_ENV, load, load_with};
pub use model::{DepositConfig, EventsPolicy, LockPolicy, LogFormatSetting, QueuePolicy, TelemetrySettings};
