//! Test fixtures: users, records, and payload files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use deposit_core::{
    ContentDescriptor, ContentSource, DescriptorId, FileSet, FileSetId, Relation, User,
    Visibility, Work,
};
use tempfile::TempDir;
use url::Url;

/// Depositor used by most scenarios.
#[must_use]
pub fn depositor() -> User {
    User::new("depositor@example.org").with_groups(["registered"])
}

/// Curator holding edit rights through the `curators` group.
#[must_use]
pub fn curator() -> User {
    User::new("curator@example.org").with_groups(["registered", "curators"])
}

/// Unsaved work with the given visibility.
#[must_use]
pub fn work(title: &str, visibility: Visibility) -> Work {
    Work::new(title).with_visibility(visibility)
}

/// Unsaved file set that passes validation.
#[must_use]
pub fn titled_file_set(title: &str) -> FileSet {
    FileSet {
        title: vec![title.to_string()],
        ..FileSet::new()
    }
}

/// Descriptor for the original-file relation of `file_set_id`.
#[must_use]
pub fn descriptor(file_set_id: FileSetId, user: &User, source: ContentSource) -> ContentDescriptor {
    let original_name = source
        .local_path()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_default();
    ContentDescriptor {
        id: DescriptorId::generate(),
        file_set_id,
        user_key: user.user_key.clone(),
        relation: Relation::OriginalFile,
        source,
        original_name,
        created_at: Utc::now(),
    }
}

/// Payload file living in a temporary directory that is removed on drop.
pub struct PayloadFile {
    _dir: TempDir,
    path: PathBuf,
}

impl PayloadFile {
    /// Location of the payload.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Payload as a raw file source.
    #[must_use]
    pub fn source(&self) -> ContentSource {
        ContentSource::raw_file(&self.path)
    }

    /// Payload as a cached upload addressed by a `file://` URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be expressed as a URL.
    pub fn cached_upload(&self, filename: Option<&str>) -> anyhow::Result<ContentSource> {
        let url = Url::from_file_path(&self.path)
            .map_err(|()| anyhow::anyhow!("payload path is not absolute"))?;
        Ok(ContentSource::CachedUpload {
            upload_id: DescriptorId::generate().to_string(),
            filename: filename.map(str::to_string),
            file_url: url.to_string(),
        })
    }

    /// Payload wrapped with an explicit original name.
    #[must_use]
    pub fn named(&self, original_name: &str) -> ContentSource {
        ContentSource::NamedDecorator {
            original_name: original_name.to_string(),
            path: self.path.clone(),
        }
    }
}

/// Write `bytes` to a fresh temporary file called `name`.
///
/// # Errors
///
/// Returns an error if the temporary directory or file cannot be created.
pub fn payload_file(name: &str, bytes: &[u8]) -> anyhow::Result<PayloadFile> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(name);
    fs::write(&path, bytes)?;
    Ok(PayloadFile { _dir: dir, path })
}
