//! Label derivation and durable content descriptors.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use deposit_core::{
    ContentDescriptor, ContentSource, DescriptorId, FileSet, Relation, ResourceStore, User,
};
use tracing::debug;
use url::Url;

use crate::error::{ActorError, ActorResult};

/// Label used when the payload carries no usable name.
pub const UNTITLED: &str = "untitled";

/// Turns a content payload into a persisted, task-transportable descriptor.
#[derive(Clone)]
pub struct ContentWrapper {
    store: Arc<dyn ResourceStore>,
}

impl ContentWrapper {
    /// Construct a wrapper that persists descriptors through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Display label for `source`.
    ///
    /// Priority: the upload's filename, then a decorator's original name, then
    /// the file set's import URL, then the payload's own file name. A path
    /// without a file name falls back to the upload id, or [`UNTITLED`].
    #[must_use]
    pub fn label_for(file_set: &FileSet, source: &ContentSource) -> String {
        let label = match source {
            ContentSource::CachedUpload {
                filename: Some(filename),
                ..
            } if !filename.is_empty() => filename.clone(),
            ContentSource::CachedUpload { file_url, .. } => url_basename(file_url),
            ContentSource::NamedDecorator { original_name, .. } => original_name.clone(),
            ContentSource::RawFile { path } => file_set
                .import_url
                .as_ref()
                .map_or_else(|| path_basename(path), last_segment),
        };
        if !label.trim().is_empty() {
            return label;
        }
        match source {
            ContentSource::CachedUpload { upload_id, .. } if !upload_id.is_empty() => {
                upload_id.clone()
            }
            _ => UNTITLED.to_string(),
        }
    }

    /// Persist a descriptor binding `source` to `relation` of the file set.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Unsaved`] when the file set has no identifier and
    /// [`ActorError::Persistence`] when the descriptor cannot be saved.
    pub async fn wrap(
        &self,
        file_set: &FileSet,
        user: &User,
        source: ContentSource,
        relation: Relation,
    ) -> ActorResult<ContentDescriptor> {
        let file_set_id = file_set.id.ok_or(ActorError::Unsaved {
            operation: "wrap_content",
        })?;
        let descriptor = ContentDescriptor {
            id: DescriptorId::generate(),
            file_set_id,
            user_key: user.user_key.clone(),
            relation,
            original_name: Self::label_for(file_set, &source),
            source,
            created_at: Utc::now(),
        };
        let saved = self
            .store
            .save_descriptor(&descriptor)
            .await
            .map_err(|source| ActorError::persistence("save_descriptor", source))?;
        debug!(
            descriptor_id = %saved.id,
            file_set_id = %file_set_id,
            relation = %relation,
            source = saved.source.kind(),
            "content descriptor saved"
        );
        Ok(saved)
    }
}

fn url_basename(raw: &str) -> String {
    Url::parse(raw).map_or_else(|_| path_basename(Path::new(raw)), |url| last_segment(&url))
}

/// Final path segment; empty when the path ends in `/`.
fn last_segment(url: &Url) -> String {
    url.path_segments()
        .and_then(Iterator::last)
        .unwrap_or_default()
        .to_string()
}

fn path_basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn upload(filename: Option<&str>, file_url: &str) -> ContentSource {
        ContentSource::CachedUpload {
            upload_id: "u1".into(),
            filename: filename.map(str::to_string),
            file_url: file_url.into(),
        }
    }

    #[test]
    fn upload_filename_wins() {
        let label = ContentWrapper::label_for(
            &FileSet::new(),
            &upload(Some("thesis.pdf"), "file:///cache/abc123"),
        );
        assert_eq!(label, "thesis.pdf");
    }

    #[test]
    fn upload_without_filename_uses_url_path() {
        let file_set = FileSet::new();
        assert_eq!(
            ContentWrapper::label_for(
                &file_set,
                &upload(None, "https://cdn.example.org/remote/scan%201.tif?x=1")
            ),
            "scan%201.tif"
        );
        assert_eq!(
            ContentWrapper::label_for(&file_set, &upload(Some(""), "/var/cache/page.png")),
            "page.png"
        );
    }

    #[test]
    fn decorator_uses_original_name() {
        let source = ContentSource::NamedDecorator {
            original_name: "Chapter 1.docx".into(),
            path: PathBuf::from("/tmp/xyz"),
        };
        assert_eq!(
            ContentWrapper::label_for(&FileSet::new(), &source),
            "Chapter 1.docx"
        );
    }

    #[test]
    fn raw_file_prefers_import_url() -> anyhow::Result<()> {
        let source = ContentSource::raw_file("/tmp/download-8841");
        assert_eq!(
            ContentWrapper::label_for(&FileSet::new(), &source),
            "download-8841"
        );
        let imported =
            FileSet::new().with_import_url(Url::parse("https://example.org/data/survey.csv")?);
        assert_eq!(ContentWrapper::label_for(&imported, &source), "survey.csv");
        Ok(())
    }

    #[test]
    fn nameless_payloads_fall_back() -> anyhow::Result<()> {
        assert_eq!(
            ContentWrapper::label_for(&FileSet::new(), &ContentSource::raw_file("/")),
            UNTITLED
        );
        assert_eq!(
            ContentWrapper::label_for(
                &FileSet::new(),
                &upload(None, "https://cdn.example.org/uploads/")
            ),
            "u1"
        );
        let imported = FileSet::new().with_import_url(Url::parse("https://example.org/data/")?);
        assert_eq!(
            ContentWrapper::label_for(&imported, &ContentSource::raw_file("/tmp/download-8841")),
            UNTITLED
        );
        Ok(())
    }
}
