//! Typed configuration sections.
//!
//! # Design
//! - Pure data carriers; loading lives in `loader.rs`, checks in `validate.rs`.
//! - Every section deserializes with defaults so partial documents are accepted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepositConfig {
    /// Per-work lock policy.
    pub locks: LockPolicy,
    /// Deferred task queue policy.
    pub queue: QueuePolicy,
    /// Notification bus policy.
    pub events: EventsPolicy,
    /// Logging settings.
    pub telemetry: TelemetrySettings,
}

/// Per-work lock policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockPolicy {
    /// Maximum time to wait for a contended lock, in milliseconds.
    pub acquire_timeout_ms: u64,
}

impl LockPolicy {
    /// Lock wait bound as a `Duration`.
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: defaults::LOCK_ACQUIRE_TIMEOUT_MS,
        }
    }
}

/// Deferred task queue policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuePolicy {
    /// Pending tasks accepted before enqueue fails.
    pub capacity: usize,
    /// Tasks executed concurrently.
    pub concurrency: usize,
    /// Attempts per task, including the first run.
    pub max_attempts: u32,
    /// Base retry delay in milliseconds (linear backoff).
    pub retry_backoff_ms: u64,
}

impl QueuePolicy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub const fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(attempt as u64))
    }
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            capacity: defaults::QUEUE_CAPACITY,
            concurrency: defaults::QUEUE_CONCURRENCY,
            max_attempts: defaults::QUEUE_MAX_ATTEMPTS,
            retry_backoff_ms: defaults::QUEUE_RETRY_BACKOFF_MS,
        }
    }
}

/// Notification bus policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsPolicy {
    /// Events retained for replay.
    pub replay_capacity: usize,
}

impl Default for EventsPolicy {
    fn default() -> Self {
        Self {
            replay_capacity: defaults::EVENTS_REPLAY_CAPACITY,
        }
    }
}

/// Requested log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    /// Human-readable output.
    Pretty,
    /// Structured JSON output.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Log level used when `RUST_LOG` is absent.
    pub level: String,
    /// Output format; inferred from the build profile when unset.
    pub format: Option<LogFormatSetting>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: None,
        }
    }
}
