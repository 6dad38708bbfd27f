//! In-memory resource store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use deposit_core::{
    ContentDescriptor, ContentVersion, DescriptorId, FileSet, FileSetId, Relation, ResourceStore,
    StoreError, StoreResult, Work, WorkId,
};
use tracing::debug;

/// Process-local store shared by the actors and the task worker.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) file_sets: HashMap<FileSetId, FileSet>,
    pub(crate) works: HashMap<WorkId, Work>,
    pub(crate) descriptors: HashMap<DescriptorId, ContentDescriptor>,
    pub(crate) versions: HashMap<(FileSetId, Relation), Vec<StoredVersion>>,
}

pub(crate) struct StoredVersion {
    pub(crate) version: ContentVersion,
    pub(crate) bytes: Vec<u8>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of file sets currently stored.
    #[must_use]
    pub fn file_set_count(&self) -> usize {
        self.read().file_sets.len()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn save_file_set(&self, file_set: &FileSet) -> StoreResult<FileSet> {
        let errors = file_set.validate();
        if !errors.is_empty() {
            return Err(StoreError::Invalid {
                kind: "file_set",
                errors,
            });
        }

        let mut state = self.write();
        let mut saved = file_set.clone();
        let id = match saved.id {
            Some(id) => {
                if !state.file_sets.contains_key(&id) {
                    return Err(StoreError::not_found("file_set", id));
                }
                id
            }
            None => {
                let id = FileSetId::generate();
                saved.id = Some(id);
                saved.date_uploaded.get_or_insert_with(Utc::now);
                id
            }
        };
        state.file_sets.insert(id, saved.clone());
        debug!(file_set_id = %id, "file set saved");
        Ok(saved)
    }

    async fn find_file_set(&self, id: FileSetId) -> StoreResult<FileSet> {
        self.read()
            .file_sets
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("file_set", id))
    }

    async fn delete_file_set(&self, id: FileSetId) -> StoreResult<()> {
        let mut state = self.write();
        if state.file_sets.remove(&id).is_none() {
            return Err(StoreError::not_found("file_set", id));
        }
        state.descriptors.retain(|_, descriptor| descriptor.file_set_id != id);
        state.versions.retain(|(file_set_id, _), _| *file_set_id != id);

        for work in state.works.values_mut() {
            let before = work.member_ids.len();
            work.member_ids.retain(|member| *member != id);
            let mut changed = work.member_ids.len() != before;
            if work.representative_id == Some(id) {
                work.representative_id = None;
                changed = true;
            }
            if work.thumbnail_id == Some(id) {
                work.thumbnail_id = None;
                changed = true;
            }
            if changed {
                work.version += 1;
                work.date_modified = Some(Utc::now());
            }
        }
        debug!(file_set_id = %id, "file set deleted");
        Ok(())
    }

    async fn save_work(&self, work: &Work) -> StoreResult<Work> {
        let errors = work.validate();
        if !errors.is_empty() {
            return Err(StoreError::Invalid {
                kind: "work",
                errors,
            });
        }

        let mut state = self.write();
        let stored_version = state.works.get(&work.id).map_or(0, |stored| stored.version);
        if stored_version != work.version {
            return Err(StoreError::Stale {
                id: work.id.to_string(),
                expected: work.version,
                found: stored_version,
            });
        }
        let mut saved = work.clone();
        saved.version = stored_version + 1;
        state.works.insert(saved.id, saved.clone());
        debug!(work_id = %saved.id, version = saved.version, "work saved");
        Ok(saved)
    }

    async fn find_work(&self, id: WorkId) -> StoreResult<Work> {
        self.read()
            .works
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("work", id))
    }

    async fn find_parent(&self, file_set_id: FileSetId) -> StoreResult<Option<Work>> {
        Ok(self
            .read()
            .works
            .values()
            .find(|work| work.has_member(file_set_id))
            .cloned())
    }

    async fn find_members(&self, work_id: WorkId) -> StoreResult<Vec<FileSet>> {
        let state = self.read();
        let work = state
            .works
            .get(&work_id)
            .ok_or_else(|| StoreError::not_found("work", work_id))?;
        Ok(work
            .member_ids
            .iter()
            .filter_map(|id| state.file_sets.get(id).cloned())
            .collect())
    }

    async fn save_descriptor(
        &self,
        descriptor: &ContentDescriptor,
    ) -> StoreResult<ContentDescriptor> {
        let mut state = self.write();
        if !state.file_sets.contains_key(&descriptor.file_set_id) {
            return Err(StoreError::not_found("file_set", descriptor.file_set_id));
        }
        state.descriptors.insert(descriptor.id, descriptor.clone());
        Ok(descriptor.clone())
    }

    async fn find_descriptor(&self, id: DescriptorId) -> StoreResult<ContentDescriptor> {
        self.read()
            .descriptors
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("descriptor", id))
    }
}
