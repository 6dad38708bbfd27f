//! Deferred task descriptors and the handles returned on enqueue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DescriptorId, WorkId};

/// Work handed to the asynchronous task queue.
///
/// Tasks reference persisted records by identifier only, so they can be
/// executed by a different process than the one that enqueued them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    /// Ingest the payload described by a persisted descriptor.
    Ingest {
        /// Descriptor to ingest.
        descriptor_id: DescriptorId,
        /// Whether the depositor asked to be notified on completion.
        notify: bool,
    },
    /// Copy the work's visibility onto its member file sets.
    CopyVisibility {
        /// Work whose members are updated.
        work_id: WorkId,
    },
    /// Union the work's grants into its member file sets.
    InheritPermissions {
        /// Work whose members are updated.
        work_id: WorkId,
    },
}

impl Task {
    /// Machine-friendly discriminator for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ingest { .. } => "ingest",
            Self::CopyVisibility { .. } => "copy_visibility",
            Self::InheritPermissions { .. } => "inherit_permissions",
        }
    }
}

/// Receipt for an enqueued task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    /// Queue-assigned identifier.
    pub id: Uuid,
    /// Task discriminator.
    pub kind: String,
    /// When the task was accepted.
    pub enqueued_at: DateTime<Utc>,
}

impl TaskHandle {
    /// Fresh handle for `task`.
    #[must_use]
    pub fn for_task(task: &Task) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: task.kind().to_string(),
            enqueued_at: Utc::now(),
        }
    }
}
