#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]

//! Binary entrypoint that wires the deposit services together and runs the
//! task worker until interrupted.

use deposit_app::{AppResult, run_app};

/// Bootstraps the deposit services and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
