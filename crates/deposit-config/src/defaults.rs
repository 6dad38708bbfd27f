//! Default values for configuration sections.
//!
//! # Design
//! - Keep every tunable in one place so documentation and tests agree.

/// Bounded wait for a per-work lock.
pub(crate) const LOCK_ACQUIRE_TIMEOUT_MS: u64 = 30_000;
/// Pending tasks accepted before enqueue reports the queue as full.
pub(crate) const QUEUE_CAPACITY: usize = 1_024;
/// Tasks executed concurrently by the worker.
pub(crate) const QUEUE_CONCURRENCY: usize = 4;
/// Attempts per task, including the first run.
pub(crate) const QUEUE_MAX_ATTEMPTS: u32 = 3;
/// Base delay between attempts; multiplied by the attempt number.
pub(crate) const QUEUE_RETRY_BACKOFF_MS: u64 = 250;
/// Events retained for reconnecting subscribers.
pub(crate) const EVENTS_REPLAY_CAPACITY: usize = 1_024;
/// Log level used when `RUST_LOG` is absent.
pub(crate) const LOG_LEVEL: &str = "info";
