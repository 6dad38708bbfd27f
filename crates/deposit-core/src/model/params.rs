//! Caller-supplied parameters for metadata creation and update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Visibility;

/// Access settings supplied when a file set is created.
///
/// Any of `visibility`, `embargo_release_date` or `lease_expiration_date`
/// counts as an explicit assignment; without one, visibility is inherited from
/// the parent work on attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSetParams {
    /// Visibility to apply directly.
    pub visibility: Option<Visibility>,
    /// Embargo release instant.
    pub embargo_release_date: Option<DateTime<Utc>>,
    /// Visibility while embargoed (defaults to restricted).
    pub visibility_during_embargo: Option<Visibility>,
    /// Visibility once the embargo lifts (defaults to open).
    pub visibility_after_embargo: Option<Visibility>,
    /// Lease expiration instant.
    pub lease_expiration_date: Option<DateTime<Utc>>,
    /// Visibility while leased (defaults to open).
    pub visibility_during_lease: Option<Visibility>,
    /// Visibility once the lease expires (defaults to restricted).
    pub visibility_after_lease: Option<Visibility>,
}

impl FileSetParams {
    /// Params that set a plain visibility.
    #[must_use]
    pub fn with_visibility(visibility: Visibility) -> Self {
        Self {
            visibility: Some(visibility),
            ..Self::default()
        }
    }

    /// Whether the params carry an explicit visibility instruction.
    #[must_use]
    pub const fn assigns_visibility(&self) -> bool {
        self.visibility.is_some()
            || self.embargo_release_date.is_some()
            || self.lease_expiration_date.is_some()
    }
}

/// Attribute changes applied by a metadata update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSetAttributes {
    /// Replacement titles.
    pub title: Option<Vec<String>>,
    /// Replacement label.
    pub label: Option<String>,
    /// Replacement creators.
    pub creator: Option<Vec<String>>,
    /// Replacement descriptions.
    pub description: Option<Vec<String>>,
    /// Replacement keywords.
    pub keyword: Option<Vec<String>>,
    /// Replacement license statements.
    pub license: Option<Vec<String>>,
    /// Access settings; applied through the same workflow as creation.
    #[serde(flatten)]
    pub access: FileSetParams,
}
