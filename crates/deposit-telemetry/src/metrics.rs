//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges the deposit actors and task worker report.

use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    lock_acquisitions_total: IntCounterVec,
    lock_wait_ms: IntGauge,
    attachments_total: IntCounter,
    tasks_enqueued_total: IntCounterVec,
    tasks_finished_total: IntCounterVec,
    callback_failures_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    queue_depth: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Locks acquired without timing out.
    pub locks_acquired: u64,
    /// Lock acquisitions that hit the wait bound.
    pub lock_timeouts: u64,
    /// Latest observed lock wait (ms).
    pub lock_wait_ms: i64,
    /// File sets attached to works.
    pub attachments_total: u64,
    /// Tasks currently waiting or running.
    pub queue_depth: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let lock_acquisitions_total = counter_vec(
            "lock_acquisitions_total",
            "Per-work lock acquisitions by outcome",
            &["outcome"],
        )?;
        let lock_wait_ms = gauge("lock_wait_ms", "Latest time spent waiting for a work lock (ms)")?;
        let attachments_total = IntCounter::with_opts(Opts::new(
            "attachments_total",
            "File sets attached to works",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "attachments_total",
            source,
        })?;
        let tasks_enqueued_total = counter_vec(
            "tasks_enqueued_total",
            "Deferred tasks accepted by kind",
            &["kind"],
        )?;
        let tasks_finished_total = counter_vec(
            "tasks_finished_total",
            "Deferred tasks finished by kind and status",
            &["kind", "status"],
        )?;
        let callback_failures_total = counter_vec(
            "callback_failures_total",
            "Lifecycle callback handlers that failed",
            &["event"],
        )?;
        let events_emitted_total = counter_vec(
            "events_emitted_total",
            "Notification events emitted by type",
            &["type"],
        )?;
        let queue_depth = gauge("queue_depth", "Deferred tasks waiting or running")?;

        register(&registry, "lock_acquisitions_total", &lock_acquisitions_total)?;
        register(&registry, "lock_wait_ms", &lock_wait_ms)?;
        register(&registry, "attachments_total", &attachments_total)?;
        register(&registry, "tasks_enqueued_total", &tasks_enqueued_total)?;
        register(&registry, "tasks_finished_total", &tasks_finished_total)?;
        register(&registry, "callback_failures_total", &callback_failures_total)?;
        register(&registry, "events_emitted_total", &events_emitted_total)?;
        register(&registry, "queue_depth", &queue_depth)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                lock_acquisitions_total,
                lock_wait_ms,
                attachments_total,
                tasks_enqueued_total,
                tasks_finished_total,
                callback_failures_total,
                events_emitted_total,
                queue_depth,
            }),
        })
    }

    /// Record a successful lock acquisition and how long it waited.
    pub fn observe_lock_acquired(&self, waited: Duration) {
        self.inner
            .lock_acquisitions_total
            .with_label_values(&["acquired"])
            .inc();
        self.inner.lock_wait_ms.set(Self::duration_to_ms(waited));
    }

    /// Record a lock acquisition that hit the wait bound.
    pub fn inc_lock_timeout(&self) {
        self.inner
            .lock_acquisitions_total
            .with_label_values(&["timeout"])
            .inc();
    }

    /// Increment the attachment counter.
    pub fn inc_attachment(&self) {
        self.inner.attachments_total.inc();
    }

    /// Record an accepted task and bump the queue depth.
    pub fn inc_task_enqueued(&self, kind: &str) {
        self.inner
            .tasks_enqueued_total
            .with_label_values(&[kind])
            .inc();
        self.inner.queue_depth.inc();
    }

    /// Record a finished task (`completed` or `failed`) and drop the queue depth.
    pub fn inc_task_finished(&self, kind: &str, status: &str) {
        self.inner
            .tasks_finished_total
            .with_label_values(&[kind, status])
            .inc();
        self.inner.queue_depth.dec();
    }

    /// Record failed lifecycle callback handlers.
    pub fn inc_callback_failures(&self, event: &str, failed: usize) {
        if failed == 0 {
            return;
        }
        self.inner
            .callback_failures_total
            .with_label_values(&[event])
            .inc_by(u64::try_from(failed).unwrap_or(u64::MAX));
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Count of finished tasks for a kind and status.
    #[must_use]
    pub fn tasks_finished(&self, kind: &str, status: &str) -> u64 {
        self.inner
            .tasks_finished_total
            .with_label_values(&[kind, status])
            .get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let locks = &self.inner.lock_acquisitions_total;
        MetricsSnapshot {
            locks_acquired: locks.with_label_values(&["acquired"]).get(),
            lock_timeouts: locks.with_label_values(&["timeout"]).get(),
            lock_wait_ms: self.inner.lock_wait_ms.get(),
            attachments_total: self.inner.attachments_total.get(),
            queue_depth: self.inner.queue_depth.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
