use std::sync::Arc;

use deposit_actors::{ActorServices, FileSetActor, LockManager};
use deposit_config::{DepositConfig, LogFormatSetting};
use deposit_core::{CallbackRegistry, FileSet, User};
use deposit_events::EventBus;
use deposit_ingest::{FileIngestService, JobRunner, WorkerHandle, WorkerQueue};
use deposit_runtime::{MemoryStore, PermissionAbilityProvider};
use deposit_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Wired deposit services: the shared actor collaborators plus the worker
/// draining the task queue.
pub struct DepositApp {
    config: DepositConfig,
    store: Arc<MemoryStore>,
    services: ActorServices,
    worker: WorkerHandle,
}

impl DepositApp {
    /// Build every service from `config` and start the task worker.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics registry cannot be created.
    pub fn build(config: DepositConfig) -> AppResult<Self> {
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let events = EventBus::with_capacity(config.events.replay_capacity);
        let store = Arc::new(MemoryStore::new());
        let ingest = Arc::new(FileIngestService::new(store.clone()));

        let runner = JobRunner::new(
            store.clone(),
            ingest.clone(),
            events.clone(),
            metrics.clone(),
        );
        let (queue, worker) = WorkerQueue::spawn(runner, config.queue.clone(), metrics.clone());

        let services = ActorServices {
            store: store.clone(),
            queue: Arc::new(queue),
            ingest,
            abilities: Arc::new(PermissionAbilityProvider),
            callbacks: CallbackRegistry::new(),
            locks: LockManager::new(&config.locks).with_metrics(metrics.clone()),
            events,
            metrics,
        };
        info!(
            lock_timeout_ms = config.locks.acquire_timeout_ms,
            queue_capacity = config.queue.capacity,
            queue_concurrency = config.queue.concurrency,
            "deposit services ready"
        );
        Ok(Self {
            config,
            store,
            services,
            worker,
        })
    }

    /// Actor for `file_set` acting as `user`.
    #[must_use]
    pub fn actor(&self, file_set: FileSet, user: User) -> FileSetActor {
        FileSetActor::new(self.services.clone(), file_set, user)
    }

    /// Shared actor collaborators.
    #[must_use]
    pub const fn services(&self) -> &ActorServices {
        &self.services
    }

    /// Authoritative in-process store.
    #[must_use]
    pub const fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Configuration the services were built from.
    #[must_use]
    pub const fn config(&self) -> &DepositConfig {
        &self.config
    }

    /// Stop accepting tasks and wait for in-flight ones to finish.
    pub async fn shutdown(self) {
        self.worker.shutdown().await;
        info!("task worker stopped");
    }
}

/// Entry point for the deposit service boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, telemetry or signal handling fails.
pub async fn run_app() -> AppResult<()> {
    let config = deposit_config::load().map_err(|err| AppError::config("config.load", err))?;
    run_app_with(config).await
}

/// Boot sequence over an already loaded configuration.
pub(crate) async fn run_app_with(config: DepositConfig) -> AppResult<()> {
    let logging = logging_config(&config);
    deposit_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("deposit");

    info!("deposit bootstrap starting");
    let app = DepositApp::build(config)?;

    let signal = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
    app.shutdown().await;
    signal.map_err(|err| AppError::io("signal.ctrl_c", err))
}

fn logging_config(config: &DepositConfig) -> LoggingConfig<'_> {
    LoggingConfig {
        level: &config.telemetry.level,
        format: config
            .telemetry
            .format
            .map_or_else(LogFormat::infer, |format| match format {
                LogFormatSetting::Json => LogFormat::Json,
                LogFormatSetting::Pretty => LogFormat::Pretty,
            }),
        ..LoggingConfig::default()
    }
}
