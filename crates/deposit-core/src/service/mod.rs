//! Collaborator traits the deposit actors are written against.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{IngestResult, QueueResult, StoreResult};
use crate::model::{
    ContentDescriptor, ContentVersion, DescriptorId, FileSet, FileSetId, NewContentVersion,
    Relation, Task, TaskHandle, User, Work, WorkId,
};

/// Authoritative store for works, file sets and content descriptors.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Persist a file set, assigning an identifier on first save.
    async fn save_file_set(&self, file_set: &FileSet) -> StoreResult<FileSet>;

    /// Load a file set by identifier.
    async fn find_file_set(&self, id: FileSetId) -> StoreResult<FileSet>;

    /// Delete a file set, its content, and its membership in any work.
    async fn delete_file_set(&self, id: FileSetId) -> StoreResult<()>;

    /// Persist a work; the write must carry the currently stored version.
    async fn save_work(&self, work: &Work) -> StoreResult<Work>;

    /// Load the latest copy of a work.
    async fn find_work(&self, id: WorkId) -> StoreResult<Work>;

    /// Work whose member list contains the file set, if any.
    async fn find_parent(&self, file_set_id: FileSetId) -> StoreResult<Option<Work>>;

    /// Member file sets of a work, in member order.
    async fn find_members(&self, work_id: WorkId) -> StoreResult<Vec<FileSet>>;

    /// Persist a content descriptor so deferred tasks can reference it.
    async fn save_descriptor(&self, descriptor: &ContentDescriptor)
    -> StoreResult<ContentDescriptor>;

    /// Load a content descriptor by identifier.
    async fn find_descriptor(&self, id: DescriptorId) -> StoreResult<ContentDescriptor>;
}

/// Versioned binary storage keyed by file set and relation.
#[async_trait]
pub trait BinaryStore: Send + Sync {
    /// Record a new version, assigning its revision identifier.
    async fn append_version(&self, version: NewContentVersion) -> StoreResult<ContentVersion>;

    /// Versions recorded for a relation, oldest first.
    async fn versions(
        &self,
        file_set_id: FileSetId,
        relation: Relation,
    ) -> StoreResult<Vec<ContentVersion>>;

    /// Bytes of a specific revision.
    async fn content(
        &self,
        file_set_id: FileSetId,
        relation: Relation,
        revision_id: &str,
    ) -> StoreResult<Vec<u8>>;
}

/// Asynchronous task queue; tasks run at least once.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Accept a task for deferred execution.
    async fn enqueue(&self, task: Task) -> QueueResult<TaskHandle>;
}

/// Strategy that moves payload bytes into the binary store.
#[async_trait]
pub trait IngestStrategy: Send + Sync {
    /// Ingest the payload of a persisted descriptor. Must be safe to re-run.
    async fn ingest_file(&self, descriptor: &ContentDescriptor) -> IngestResult<ContentVersion>;

    /// Restore an earlier revision of a relation as its newest version.
    async fn revert_to(
        &self,
        file_set_id: FileSetId,
        relation: Relation,
        revision_id: &str,
        user: &User,
    ) -> IngestResult<ContentVersion>;
}

/// Capability checks consulted by metadata workflows.
pub trait Ability: Send + Sync {
    /// Whether the user may edit the file set.
    fn can_edit(&self, file_set: &FileSet) -> bool;
}

/// Produces the capability object for a user.
pub trait AbilityProvider: Send + Sync {
    /// Build the ability for `user`.
    fn ability_for(&self, user: &User) -> Arc<dyn Ability>;
}
