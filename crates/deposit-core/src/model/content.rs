//! Content payloads, transport descriptors and recorded versions.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{DescriptorId, FileSetId};

/// Slot on a file set that a binary is attached to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// The deposited binary.
    #[default]
    OriginalFile,
    /// Full text extracted from the original.
    ExtractedText,
    /// Derived thumbnail image.
    Thumbnail,
}

impl Relation {
    /// Render the relation as its wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OriginalFile => "original_file",
            Self::ExtractedText => "extracted_text",
            Self::Thumbnail => "thumbnail",
        }
    }
}

impl Display for Relation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Uploaded payload, resolved into one of the supported shapes at the call boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentSource {
    /// File cached by the upload subsystem.
    CachedUpload {
        /// Upload record identifier.
        upload_id: String,
        /// Filename reported by the uploader, absent for uncached remote files.
        filename: Option<String>,
        /// Location of the cached bytes (`file://` URL, remote URL, or plain path).
        file_url: String,
    },
    /// Plain file on local disk (e.g. a temp file produced by a URL import).
    RawFile {
        /// Local path of the payload.
        path: PathBuf,
    },
    /// Local file wrapped with the name it was originally deposited under.
    NamedDecorator {
        /// Name reported by the decorator.
        original_name: String,
        /// Local path of the payload.
        path: PathBuf,
    },
}

impl ContentSource {
    /// Local path of the payload bytes, when they are reachable on this host.
    #[must_use]
    pub fn local_path(&self) -> Option<PathBuf> {
        match self {
            Self::CachedUpload { file_url, .. } => match Url::parse(file_url) {
                Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
                Ok(_) => None,
                Err(_) => Some(PathBuf::from(file_url)),
            },
            Self::RawFile { path } | Self::NamedDecorator { path, .. } => Some(path.clone()),
        }
    }

    /// Short discriminator used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CachedUpload { .. } => "cached_upload",
            Self::RawFile { .. } => "raw_file",
            Self::NamedDecorator { .. } => "named_decorator",
        }
    }

    /// Convenience constructor for a local file.
    #[must_use]
    pub fn raw_file(path: impl AsRef<Path>) -> Self {
        Self::RawFile {
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Durable record of a pending ingest, safe to hand to another process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDescriptor {
    /// Identifier assigned by the store.
    pub id: DescriptorId,
    /// File set the content belongs to.
    pub file_set_id: FileSetId,
    /// User key of the acting user.
    pub user_key: String,
    /// Target slot on the file set.
    pub relation: Relation,
    /// Payload to ingest.
    pub source: ContentSource,
    /// Name the payload was deposited under.
    pub original_name: String,
    /// When the descriptor was created.
    pub created_at: DateTime<Utc>,
}

/// Version of a binary recorded against a file set relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVersion {
    /// Revision identifier (`version1`, `version2`, ...).
    pub revision_id: String,
    /// File set the binary belongs to.
    pub file_set_id: FileSetId,
    /// Slot the binary occupies.
    pub relation: Relation,
    /// Hex-encoded SHA-256 digest of the bytes.
    pub sha256: String,
    /// Byte length.
    pub size: u64,
    /// Name the bytes were deposited under.
    pub label: String,
    /// Descriptor that produced this version, if it came from an ingest.
    pub descriptor_id: Option<DescriptorId>,
    /// Revision this version restores, if it came from a revert.
    pub reverted_from: Option<String>,
    /// When the version was recorded.
    pub created_at: DateTime<Utc>,
}

/// Version payload handed to the binary store, which assigns the revision identifier.
#[derive(Debug, Clone)]
pub struct NewContentVersion {
    /// File set the binary belongs to.
    pub file_set_id: FileSetId,
    /// Slot the binary occupies.
    pub relation: Relation,
    /// Hex-encoded SHA-256 digest of `bytes`.
    pub sha256: String,
    /// Name the bytes were deposited under.
    pub label: String,
    /// Descriptor that produced this version.
    pub descriptor_id: Option<DescriptorId>,
    /// Revision this version restores.
    pub reverted_from: Option<String>,
    /// Binary payload.
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_upload_resolves_file_urls_and_paths() {
        let file_url = ContentSource::CachedUpload {
            upload_id: "1".into(),
            filename: None,
            file_url: "file:///var/uploads/thesis.pdf".into(),
        };
        assert_eq!(
            file_url.local_path(),
            Some(PathBuf::from("/var/uploads/thesis.pdf"))
        );

        let plain = ContentSource::CachedUpload {
            upload_id: "2".into(),
            filename: None,
            file_url: "/tmp/cache/scan.tif".into(),
        };
        assert_eq!(plain.local_path(), Some(PathBuf::from("/tmp/cache/scan.tif")));

        let remote = ContentSource::CachedUpload {
            upload_id: "3".into(),
            filename: None,
            file_url: "https://cdn.example.org/a/b.mp4".into(),
        };
        assert_eq!(remote.local_path(), None);
    }

    #[test]
    fn content_source_serializes_with_kind_tag() -> anyhow::Result<()> {
        let source = ContentSource::raw_file("/tmp/x.bin");
        let json = serde_json::to_value(&source)?;
        assert_eq!(json["kind"], "raw_file");
        assert_eq!(source.kind(), "raw_file");
        Ok(())
    }

    #[test]
    fn relation_defaults_to_original_file() {
        assert_eq!(Relation::default(), Relation::OriginalFile);
        assert_eq!(Relation::ExtractedText.to_string(), "extracted_text");
    }
}
