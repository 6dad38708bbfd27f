//! Default ingest strategy: read the payload from local disk and record a version.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use deposit_core::{
    BinaryStore, ContentDescriptor, ContentVersion, FileSetId, IngestError, IngestResult,
    IngestStrategy, NewContentVersion, Relation, User,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Ingests payloads reachable on the local filesystem into a [`BinaryStore`].
#[derive(Clone)]
pub struct FileIngestService {
    content: Arc<dyn BinaryStore>,
}

impl FileIngestService {
    /// Construct the strategy over a binary store.
    #[must_use]
    pub fn new(content: Arc<dyn BinaryStore>) -> Self {
        Self { content }
    }

    async fn history(
        &self,
        file_set_id: FileSetId,
        relation: Relation,
    ) -> IngestResult<Vec<ContentVersion>> {
        self.content
            .versions(file_set_id, relation)
            .await
            .map_err(|source| IngestError::Store {
                operation: "list_versions",
                source,
            })
    }
}

#[async_trait]
impl IngestStrategy for FileIngestService {
    async fn ingest_file(&self, descriptor: &ContentDescriptor) -> IngestResult<ContentVersion> {
        let history = self
            .history(descriptor.file_set_id, descriptor.relation)
            .await?;
        if let Some(existing) = history
            .iter()
            .find(|version| version.descriptor_id == Some(descriptor.id))
        {
            debug!(
                descriptor_id = %descriptor.id,
                revision_id = %existing.revision_id,
                "descriptor already ingested"
            );
            return Ok(existing.clone());
        }

        let path = descriptor
            .source
            .local_path()
            .ok_or(IngestError::SourceUnavailable {
                descriptor_id: descriptor.id,
                reason: "payload is not on a local filesystem",
            })?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| IngestError::Io {
                operation: "read_payload",
                path: path.clone(),
                source,
            })?;

        let version = self
            .content
            .append_version(NewContentVersion {
                file_set_id: descriptor.file_set_id,
                relation: descriptor.relation,
                sha256: sha256_hex(&bytes),
                label: descriptor.original_name.clone(),
                descriptor_id: Some(descriptor.id),
                reverted_from: None,
                bytes,
            })
            .await
            .map_err(|source| IngestError::Store {
                operation: "append_version",
                source,
            })?;
        info!(
            file_set_id = %version.file_set_id,
            relation = %version.relation,
            revision_id = %version.revision_id,
            size = version.size,
            "content ingested"
        );
        Ok(version)
    }

    async fn revert_to(
        &self,
        file_set_id: FileSetId,
        relation: Relation,
        revision_id: &str,
        user: &User,
    ) -> IngestResult<ContentVersion> {
        let history = self.history(file_set_id, relation).await?;
        let target = history
            .iter()
            .find(|version| version.revision_id == revision_id)
            .ok_or_else(|| IngestError::RevisionNotFound {
                file_set_id,
                relation,
                revision_id: revision_id.to_string(),
            })?;
        let bytes = self
            .content
            .content(file_set_id, relation, revision_id)
            .await
            .map_err(|source| IngestError::Store {
                operation: "read_revision",
                source,
            })?;

        let version = self
            .content
            .append_version(NewContentVersion {
                file_set_id,
                relation,
                sha256: target.sha256.clone(),
                label: target.label.clone(),
                descriptor_id: None,
                reverted_from: Some(target.revision_id.clone()),
                bytes,
            })
            .await
            .map_err(|source| IngestError::Store {
                operation: "append_version",
                source,
            })?;
        info!(
            file_set_id = %file_set_id,
            relation = %relation,
            reverted_from = %revision_id,
            revision_id = %version.revision_id,
            user = %user.user_key,
            "content reverted"
        );
        Ok(version)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use deposit_core::{ContentSource, DescriptorId, FileSet, ResourceStore};
    use deposit_runtime::MemoryStore;
    use std::io::Write as _;

    async fn seeded() -> anyhow::Result<(MemoryStore, FileIngestService, FileSetId)> {
        let store = MemoryStore::new();
        let file_set = store
            .save_file_set(&FileSet {
                title: vec!["payload".into()],
                ..FileSet::new()
            })
            .await?;
        let id = file_set.id.ok_or_else(|| anyhow::anyhow!("id"))?;
        let service = FileIngestService::new(Arc::new(store.clone()));
        Ok((store, service, id))
    }

    fn descriptor(file_set_id: FileSetId, source: ContentSource) -> ContentDescriptor {
        ContentDescriptor {
            id: DescriptorId::generate(),
            file_set_id,
            user_key: "depositor".into(),
            relation: Relation::OriginalFile,
            source,
            original_name: "payload.txt".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn digest_is_lowercase_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn ingest_is_idempotent_per_descriptor() -> anyhow::Result<()> {
        let (store, service, id) = seeded().await?;
        let mut payload = tempfile::NamedTempFile::new()?;
        payload.write_all(b"hello")?;
        let descriptor = descriptor(id, ContentSource::raw_file(payload.path()));

        let first = service.ingest_file(&descriptor).await?;
        let again = service.ingest_file(&descriptor).await?;
        assert_eq!(first, again);
        assert_eq!(first.size, 5);
        assert_eq!(first.label, "payload.txt");
        assert_eq!(store.versions(id, Relation::OriginalFile).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn redelivered_older_descriptor_keeps_newer_content_current() -> anyhow::Result<()> {
        let (store, service, id) = seeded().await?;
        let dir = tempfile::tempdir()?;
        let old_path = dir.path().join("old.txt");
        let new_path = dir.path().join("new.txt");
        std::fs::write(&old_path, b"old")?;
        std::fs::write(&new_path, b"new")?;
        let older = descriptor(id, ContentSource::raw_file(&old_path));
        let newer = descriptor(id, ContentSource::raw_file(&new_path));

        let first = service.ingest_file(&older).await?;
        let second = service.ingest_file(&newer).await?;
        let replayed = service.ingest_file(&older).await?;

        assert_eq!(replayed, first);
        let history = store.versions(id, Relation::OriginalFile).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(
            store
                .content(id, Relation::OriginalFile, &second.revision_id)
                .await?,
            b"new".to_vec()
        );
        assert_eq!(
            history.last().map(|version| version.revision_id.as_str()),
            Some(second.revision_id.as_str())
        );
        Ok(())
    }

    #[tokio::test]
    async fn remote_sources_are_unavailable() -> anyhow::Result<()> {
        let (_store, service, id) = seeded().await?;
        let descriptor = descriptor(
            id,
            ContentSource::CachedUpload {
                upload_id: "u1".into(),
                filename: Some("a.pdf".into()),
                file_url: "https://cdn.example.org/a.pdf".into(),
            },
        );
        let err = service
            .ingest_file(&descriptor)
            .await
            .expect_err("remote payload");
        assert!(matches!(err, IngestError::SourceUnavailable { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn missing_payload_is_an_io_failure() -> anyhow::Result<()> {
        let (_store, service, id) = seeded().await?;
        let descriptor = descriptor(id, ContentSource::raw_file("/definitely/missing.bin"));
        let err = service.ingest_file(&descriptor).await.expect_err("missing");
        assert!(matches!(
            err,
            IngestError::Io {
                operation: "read_payload",
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn revert_copies_revision_forward() -> anyhow::Result<()> {
        let (store, service, id) = seeded().await?;
        let dir = tempfile::tempdir()?;
        let first_path = dir.path().join("v1.txt");
        let second_path = dir.path().join("v2.txt");
        std::fs::write(&first_path, b"first")?;
        std::fs::write(&second_path, b"second")?;

        let v1 = service
            .ingest_file(&descriptor(id, ContentSource::raw_file(&first_path)))
            .await?;
        service
            .ingest_file(&descriptor(id, ContentSource::raw_file(&second_path)))
            .await?;

        let user = User::new("depositor");
        let reverted = service
            .revert_to(id, Relation::OriginalFile, &v1.revision_id, &user)
            .await?;
        assert_eq!(reverted.revision_id, "version3");
        assert_eq!(reverted.reverted_from.as_deref(), Some("version1"));
        assert_eq!(reverted.sha256, v1.sha256);
        assert_eq!(
            store
                .content(id, Relation::OriginalFile, &reverted.revision_id)
                .await?,
            b"first".to_vec()
        );

        let err = service
            .revert_to(id, Relation::OriginalFile, "version42", &user)
            .await
            .expect_err("unknown revision");
        assert!(matches!(err, IngestError::RevisionNotFound { .. }));
        Ok(())
    }
}
