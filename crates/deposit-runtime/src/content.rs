//! Versioned binary content kept alongside the resource records.

use async_trait::async_trait;
use chrono::Utc;
use deposit_core::{
    BinaryStore, ContentVersion, FileSetId, NewContentVersion, Relation, StoreError, StoreResult,
};
use tracing::debug;

use crate::store::{MemoryStore, StoredVersion};

#[async_trait]
impl BinaryStore for MemoryStore {
    async fn append_version(&self, version: NewContentVersion) -> StoreResult<ContentVersion> {
        let mut state = self.write();
        if !state.file_sets.contains_key(&version.file_set_id) {
            return Err(StoreError::not_found("file_set", version.file_set_id));
        }
        let history = state
            .versions
            .entry((version.file_set_id, version.relation))
            .or_default();
        let recorded = ContentVersion {
            revision_id: format!("version{}", history.len() + 1),
            file_set_id: version.file_set_id,
            relation: version.relation,
            sha256: version.sha256,
            size: u64::try_from(version.bytes.len()).unwrap_or(u64::MAX),
            label: version.label,
            descriptor_id: version.descriptor_id,
            reverted_from: version.reverted_from,
            created_at: Utc::now(),
        };
        history.push(StoredVersion {
            version: recorded.clone(),
            bytes: version.bytes,
        });
        debug!(
            file_set_id = %recorded.file_set_id,
            relation = %recorded.relation,
            revision_id = %recorded.revision_id,
            "content version recorded"
        );
        Ok(recorded)
    }

    async fn versions(
        &self,
        file_set_id: FileSetId,
        relation: Relation,
    ) -> StoreResult<Vec<ContentVersion>> {
        Ok(self
            .read()
            .versions
            .get(&(file_set_id, relation))
            .map(|history| history.iter().map(|entry| entry.version.clone()).collect())
            .unwrap_or_default())
    }

    async fn content(
        &self,
        file_set_id: FileSetId,
        relation: Relation,
        revision_id: &str,
    ) -> StoreResult<Vec<u8>> {
        self.read()
            .versions
            .get(&(file_set_id, relation))
            .and_then(|history| {
                history
                    .iter()
                    .find(|entry| entry.version.revision_id == revision_id)
            })
            .map(|entry| entry.bytes.clone())
            .ok_or_else(|| StoreError::not_found("content", revision_id))
    }
}
