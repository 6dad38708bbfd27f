//! Event payload types carried across the platform.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed lifecycle events surfaced to notification consumers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Content was ingested into a file set relation.
    ContentIngested {
        /// File set that received the content.
        file_set_id: Uuid,
        /// Relation the content was attached to.
        relation: String,
        /// Revision recorded for the content.
        revision_id: String,
        /// User who deposited the content.
        user_key: String,
        /// Whether the depositor asked to be notified.
        notify: bool,
    },
    /// An ingest task exhausted its attempts.
    IngestFailed {
        /// File set the content was destined for, when known.
        file_set_id: Option<Uuid>,
        /// Descriptor that could not be ingested.
        descriptor_id: Uuid,
        /// User who deposited the content, when known.
        user_key: Option<String>,
        /// Failure detail.
        message: String,
    },
    /// A relation was reverted to an earlier revision.
    ContentReverted {
        /// File set that was reverted.
        file_set_id: Uuid,
        /// Relation that was reverted.
        relation: String,
        /// Revision that was restored.
        revision_id: String,
        /// User who requested the revert.
        user_key: String,
    },
    /// A file set joined a work's member list.
    FileSetAttached {
        /// Attached file set.
        file_set_id: Uuid,
        /// Parent work.
        work_id: Uuid,
    },
    /// A file set was removed.
    FileSetDestroyed {
        /// Removed file set.
        file_set_id: Uuid,
        /// Work it was detached from, if any.
        work_id: Option<Uuid>,
    },
    /// A work's visibility was copied onto its members.
    VisibilityCopied {
        /// Source work.
        work_id: Uuid,
        /// Members that changed.
        updated: usize,
    },
    /// A work's grants were unioned into its members.
    PermissionsInherited {
        /// Source work.
        work_id: Uuid,
        /// Members that changed.
        updated: usize,
    },
    /// A deferred task other than ingest exhausted its attempts.
    TaskFailed {
        /// Queue-assigned task identifier.
        task_id: Uuid,
        /// Task discriminator.
        kind: String,
        /// Failure detail.
        message: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for notification consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ContentIngested { .. } => "content_ingested",
            Self::IngestFailed { .. } => "ingest_failed",
            Self::ContentReverted { .. } => "content_reverted",
            Self::FileSetAttached { .. } => "file_set_attached",
            Self::FileSetDestroyed { .. } => "file_set_destroyed",
            Self::VisibilityCopied { .. } => "visibility_copied",
            Self::PermissionsInherited { .. } => "permissions_inherited",
            Self::TaskFailed { .. } => "task_failed",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_matches_serde_tag() {
        let events = [
            Event::ContentIngested {
                file_set_id: Uuid::nil(),
                relation: "original_file".into(),
                revision_id: "version1".into(),
                user_key: "u".into(),
                notify: true,
            },
            Event::IngestFailed {
                file_set_id: None,
                descriptor_id: Uuid::nil(),
                user_key: None,
                message: "missing".into(),
            },
            Event::FileSetDestroyed {
                file_set_id: Uuid::nil(),
                work_id: None,
            },
            Event::TaskFailed {
                task_id: Uuid::nil(),
                kind: "copy_visibility".into(),
                message: "boom".into(),
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).expect("serialize event");
            assert_eq!(json["type"], event.kind());
        }
    }
}
