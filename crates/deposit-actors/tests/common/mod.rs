#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use deposit_actors::{ActorServices, FileSetActor, LockManager};
use deposit_config::LockPolicy;
use deposit_core::{CallbackEvent, CallbackRegistry, FileSet, FileSetId, User};
use deposit_events::{Event, EventBus};
use deposit_ingest::FileIngestService;
use deposit_runtime::{MemoryStore, PermissionAbilityProvider};
use deposit_telemetry::Metrics;
use deposit_test_support::mocks::{FaultyStore, RecordingQueue};

/// Actor services over an in-memory store with fault injection and a recording queue.
pub struct Harness {
    pub memory: Arc<MemoryStore>,
    pub store: Arc<FaultyStore>,
    pub queue: Arc<RecordingQueue>,
    pub services: ActorServices,
}

impl Harness {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_lock_timeout(Duration::from_secs(5))
    }

    pub fn with_lock_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let memory = Arc::new(MemoryStore::new());
        let store = Arc::new(FaultyStore::new(memory.clone()));
        let queue = Arc::new(RecordingQueue::new());
        let metrics = Metrics::new()?;
        let policy = LockPolicy {
            acquire_timeout_ms: u64::try_from(timeout.as_millis())?,
        };
        let services = ActorServices {
            store: store.clone(),
            queue: queue.clone(),
            ingest: Arc::new(FileIngestService::new(memory.clone())),
            abilities: Arc::new(PermissionAbilityProvider),
            callbacks: CallbackRegistry::new(),
            locks: LockManager::new(&policy).with_metrics(metrics.clone()),
            events: EventBus::new(),
            metrics,
        };
        Ok(Self {
            memory,
            store,
            queue,
            services,
        })
    }

    pub fn actor(&self, file_set: FileSet, user: User) -> FileSetActor {
        FileSetActor::new(self.services.clone(), file_set, user)
    }

    /// Record the file set id and `extra` argument of every `event` dispatch.
    pub fn record_callbacks(&self, event: CallbackEvent) -> Arc<Mutex<Vec<CallbackCall>>> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        self.services.callbacks.set(event, move |ctx| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(CallbackCall {
                    file_set_id: ctx.subject.file_set_id(),
                    user_key: ctx.user.user_key.clone(),
                    extra: ctx.extra.map(str::to_string),
                });
            Ok(())
        });
        calls
    }

    /// Every event published so far, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.services
            .events
            .backlog_since(0)
            .into_iter()
            .map(|envelope| envelope.event)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackCall {
    pub file_set_id: Option<FileSetId>,
    pub user_key: String,
    pub extra: Option<String>,
}

pub fn calls(recorded: &Arc<Mutex<Vec<CallbackCall>>>) -> Vec<CallbackCall> {
    recorded
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn id_of(file_set: &FileSet) -> anyhow::Result<FileSetId> {
    file_set
        .id
        .ok_or_else(|| anyhow::anyhow!("file set was not persisted"))
}
