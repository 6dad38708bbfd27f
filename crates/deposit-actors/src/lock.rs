//! Per-key exclusive locks with a bounded wait.
//!
//! Each key maps to its own async mutex, so unrelated keys never contend. A
//! [`LockGuard`] releases on drop and prunes the key once nobody else holds
//! or awaits it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use deposit_config::LockPolicy;
use deposit_core::WorkId;
use deposit_telemetry::Metrics;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Result alias for lock acquisition.
pub type LockResult<T> = Result<T, LockError>;

/// Failures raised while acquiring a lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock was still held when the wait bound elapsed.
    #[error("lock acquisition timed out")]
    Timeout {
        /// Key that could not be locked.
        key: String,
        /// How long the caller waited.
        waited: Duration,
    },
}

/// Lock key guarding the member list of `work_id`.
#[must_use]
pub fn work_key(work_id: WorkId) -> String {
    format!("work:{work_id}")
}

type KeyTable = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Shared registry of per-key locks; clones share the same table.
#[derive(Clone)]
pub struct LockManager {
    keys: Arc<KeyTable>,
    timeout: Duration,
    metrics: Option<Metrics>,
}

impl LockManager {
    /// Build a manager that waits at most `policy.acquire_timeout()` per acquisition.
    #[must_use]
    pub fn new(policy: &LockPolicy) -> Self {
        Self {
            keys: Arc::new(Mutex::new(HashMap::new())),
            timeout: policy.acquire_timeout(),
            metrics: None,
        }
    }

    /// Record acquisitions and timeouts in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Configured wait bound.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Acquire the lock for `key`, waiting at most the configured bound.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] when the lock is not released in time.
    pub async fn acquire(&self, key: &str) -> LockResult<LockGuard> {
        let slot = Arc::clone(
            self.table()
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        );

        let started = Instant::now();
        match tokio::time::timeout(self.timeout, slot.lock_owned()).await {
            Ok(held) => {
                let waited = started.elapsed();
                if let Some(metrics) = &self.metrics {
                    metrics.observe_lock_acquired(waited);
                }
                debug!(key, waited_ms = millis(waited), "lock acquired");
                Ok(LockGuard {
                    key: key.to_string(),
                    held: Some(held),
                    keys: Arc::clone(&self.keys),
                })
            }
            Err(_) => {
                let waited = started.elapsed();
                if let Some(metrics) = &self.metrics {
                    metrics.inc_lock_timeout();
                }
                warn!(key, waited_ms = millis(waited), "lock acquisition timed out");
                // The abandoned wait dropped its clone; prune if the key is now idle.
                prune(&self.keys, key);
                Err(LockError::Timeout {
                    key: key.to_string(),
                    waited,
                })
            }
        }
    }

    /// Run `operation` while holding the lock for `key` and return its result.
    ///
    /// The lock is released on every exit path, including when the returned
    /// future is dropped before completion.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] without running `operation` when the
    /// lock cannot be acquired in time.
    pub async fn with_lock<F, Fut, T>(&self, key: &str, operation: F) -> LockResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire(key).await?;
        Ok(operation().await)
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped ownership of one key; dropping it releases the lock.
pub struct LockGuard {
    key: String,
    held: Option<OwnedMutexGuard<()>>,
    keys: Arc<KeyTable>,
}

impl LockGuard {
    /// Key this guard holds.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Release before pruning so the table holds the last reference.
        drop(self.held.take());
        prune(&self.keys, &self.key);
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn prune(keys: &KeyTable, key: &str) {
    let mut table = keys.lock().unwrap_or_else(PoisonError::into_inner);
    if table
        .get(key)
        .is_some_and(|slot| Arc::strong_count(slot) == 1)
    {
        table.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager(timeout_ms: u64) -> LockManager {
        LockManager::new(&LockPolicy {
            acquire_timeout_ms: timeout_ms,
        })
    }

    #[tokio::test]
    async fn with_lock_returns_operation_result_and_prunes() -> anyhow::Result<()> {
        let locks = manager(1_000);
        let value = locks.with_lock("work:a", || async { 41 + 1 }).await?;
        assert_eq!(value, 42);
        assert_eq!(locks.tracked_keys(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn contended_key_times_out_without_running() -> anyhow::Result<()> {
        let locks = manager(20);
        let held = locks.acquire("work:a").await?;
        let ran = AtomicUsize::new(0);

        let err = locks
            .with_lock("work:a", || async {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .expect_err("held elsewhere");
        assert!(matches!(err, LockError::Timeout { ref key, .. } if key == "work:a"));
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        drop(held);
        locks.with_lock("work:a", || async {}).await?;
        assert_eq!(locks.tracked_keys(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() -> anyhow::Result<()> {
        let locks = manager(20);
        let first = locks.acquire("work:a").await?;
        let second = locks.acquire("work:b").await?;
        assert_eq!((first.key(), second.key()), ("work:a", "work:b"));
        assert_eq!(locks.tracked_keys(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn guard_released_on_error_path() -> anyhow::Result<()> {
        let locks = manager(50);
        let failed: LockResult<Result<(), &str>> =
            locks.with_lock("work:a", || async { Err("boom") }).await;
        assert!(matches!(failed, Ok(Err("boom"))));
        assert!(locks.acquire("work:a").await.is_ok());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn lock_serialises_read_modify_write() -> anyhow::Result<()> {
        let locks = manager(5_000);
        let counter = Arc::new(Mutex::new(0_u32));
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            let counter = Arc::clone(&counter);
            tasks.push(tokio::spawn(async move {
                locks
                    .with_lock("work:shared", || async {
                        let current = *counter.lock().unwrap_or_else(PoisonError::into_inner);
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        *counter.lock().unwrap_or_else(PoisonError::into_inner) = current + 1;
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await??;
        }
        assert_eq!(*counter.lock().unwrap_or_else(PoisonError::into_inner), 16);
        Ok(())
    }

    #[tokio::test]
    async fn metrics_observe_acquisitions_and_timeouts() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let locks = manager(10).with_metrics(metrics.clone());
        let held = locks.acquire("k").await?;
        assert!(locks.acquire("k").await.is_err());
        drop(held);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.locks_acquired, 1);
        assert_eq!(snapshot.lock_timeouts, 1);
        Ok(())
    }
}
