//! The file set actor and the collaborators it is constructed with.

mod attach;
mod content;
mod metadata;
mod teardown;

use std::sync::Arc;

use deposit_core::{
    AbilityProvider, CallbackEvent, CallbackRegistry, CallbackSubject, ContentVersion, FileSet,
    IngestStrategy, ResourceStore, StoreError, TaskHandle, TaskQueue, User, ValidationErrors,
};
use deposit_events::{Event, EventBus};
use deposit_telemetry::Metrics;

use crate::lock::LockManager;
use crate::wrapper::ContentWrapper;

/// Collaborators injected into every actor. Cloning shares them.
#[derive(Clone)]
pub struct ActorServices {
    /// Authoritative resource store.
    pub store: Arc<dyn ResourceStore>,
    /// Deferred task queue.
    pub queue: Arc<dyn TaskQueue>,
    /// Strategy used for synchronous ingest and reverts.
    pub ingest: Arc<dyn IngestStrategy>,
    /// Authorization boundary for metadata updates.
    pub abilities: Arc<dyn AbilityProvider>,
    /// Lifecycle hooks.
    pub callbacks: CallbackRegistry,
    /// Per-work locks.
    pub locks: LockManager,
    /// Notification side channel.
    pub events: EventBus,
    /// Metrics registry.
    pub metrics: Metrics,
}

impl ActorServices {
    fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        self.events.publish(event);
    }

    fn run_callback(
        &self,
        event: CallbackEvent,
        subject: CallbackSubject<'_>,
        user: &User,
        extra: Option<&str>,
    ) {
        let report = self.callbacks.run(event, subject, user, extra);
        self.metrics
            .inc_callback_failures(event.as_str(), report.failed);
    }
}

/// Result of [`FileSetActor::create_content`].
#[derive(Debug)]
pub enum ContentOutcome {
    /// Ingest was deferred to the task queue.
    Scheduled(TaskHandle),
    /// Ingest ran in-process; parent propagation tasks were queued when a parent exists.
    Ingested {
        /// Version recorded by the ingest.
        version: ContentVersion,
        /// Visibility and permission propagation tasks.
        follow_ups: Vec<TaskHandle>,
    },
    /// The file set could not be saved, so nothing was scheduled.
    NotSaved(StoreError),
}

/// Result of metadata operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// Metadata was applied.
    Applied,
    /// Metadata was rejected; the file set keeps its previous state.
    Rejected(ValidationErrors),
}

impl MetadataOutcome {
    /// Whether the metadata was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Result of [`FileSetActor::attach_to_work`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachOutcome {
    /// Whether the work was persisted; `false` when its save was rejected.
    pub work_saved: bool,
    /// Whether the file set (with any inherited visibility) was persisted.
    pub file_set_saved: bool,
}

/// Drives the lifecycle of one file set on behalf of one user.
pub struct FileSetActor {
    services: ActorServices,
    file_set: FileSet,
    user: User,
}

impl FileSetActor {
    /// Pair `file_set` with the acting `user`.
    #[must_use]
    pub const fn new(services: ActorServices, file_set: FileSet, user: User) -> Self {
        Self {
            services,
            file_set,
            user,
        }
    }

    /// Current state of the file set.
    #[must_use]
    pub const fn file_set(&self) -> &FileSet {
        &self.file_set
    }

    /// Acting user.
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Release the file set.
    #[must_use]
    pub fn into_file_set(self) -> FileSet {
        self.file_set
    }

    fn wrapper(&self) -> ContentWrapper {
        ContentWrapper::new(Arc::clone(&self.services.store))
    }
}
