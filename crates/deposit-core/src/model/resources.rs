//! Works, file sets and the access metadata they carry.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{FileSetId, User, WorkId};

/// Access level applied to a work or file set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Publicly readable.
    Open,
    /// Readable by any signed-in user.
    Authenticated,
    /// Readable only by explicitly granted users and groups.
    Restricted,
}

impl Visibility {
    /// Render the visibility as its wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Authenticated => "authenticated",
            Self::Restricted => "restricted",
        }
    }
}

impl Display for Visibility {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = FieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "authenticated" => Ok(Self::Authenticated),
            "restricted" => Ok(Self::Restricted),
            _ => Err(FieldError::new("visibility", "is not a recognised visibility")),
        }
    }
}

/// Time-boxed restriction that lifts on the release date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embargo {
    /// Instant after which `visibility_after` applies.
    pub release_date: DateTime<Utc>,
    /// Visibility enforced while the embargo is active.
    pub visibility_during: Visibility,
    /// Visibility applied once the embargo lifts.
    pub visibility_after: Visibility,
}

/// Time-boxed access grant that expires on the expiration date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Instant after which `visibility_after` applies.
    pub expiration_date: DateTime<Utc>,
    /// Visibility granted while the lease is active.
    pub visibility_during: Visibility,
    /// Visibility applied once the lease expires.
    pub visibility_after: Visibility,
}

/// Explicit user and group grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Users allowed to edit.
    #[serde(default)]
    pub edit_users: BTreeSet<String>,
    /// Users allowed to read.
    #[serde(default)]
    pub read_users: BTreeSet<String>,
    /// Groups allowed to edit.
    #[serde(default)]
    pub edit_groups: BTreeSet<String>,
    /// Groups allowed to read.
    #[serde(default)]
    pub read_groups: BTreeSet<String>,
}

impl Permissions {
    /// Union another grant set into this one, returning whether anything was added.
    pub fn merge(&mut self, other: &Self) -> bool {
        let before = self.len();
        self.edit_users.extend(other.edit_users.iter().cloned());
        self.read_users.extend(other.read_users.iter().cloned());
        self.edit_groups.extend(other.edit_groups.iter().cloned());
        self.read_groups.extend(other.read_groups.iter().cloned());
        self.len() != before
    }

    /// Whether the user (directly or through a group) holds edit rights.
    #[must_use]
    pub fn allows_edit(&self, user: &User) -> bool {
        self.edit_users.contains(&user.user_key)
            || user.groups.iter().any(|group| self.edit_groups.contains(group))
    }

    fn len(&self) -> usize {
        self.edit_users.len() + self.read_users.len() + self.edit_groups.len() + self.read_groups.len()
    }
}

/// Single validation failure attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field that failed validation (`base` for record-level failures).
    pub field: &'static str,
    /// Static description of the failure.
    pub message: &'static str,
}

impl FieldError {
    /// Construct a field error.
    #[must_use]
    pub const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl Display for FieldError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {}", self.field, self.message)
    }
}

impl std::error::Error for FieldError {}

/// Validation failures collected on a change set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Record a failure for `field`.
    pub fn add(&mut self, field: &'static str, message: &'static str) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Append an already-built failure.
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Whether no failures were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of collected failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Failures recorded against a single field.
    pub fn on<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors.iter().filter(move |error| error.field == field)
    }

    /// Iterate all failures in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Convert into a `Result`, treating an empty set as success.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one failure was collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                formatter.write_str("; ")?;
            }
            Display::fmt(error, formatter)?;
        }
        Ok(())
    }
}

/// One logical file plus its derivatives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    /// Identifier assigned by the store on first save.
    pub id: Option<FileSetId>,
    /// Display name, usually the original filename.
    pub label: Option<String>,
    /// Titles; falls back to the label when empty.
    #[serde(default)]
    pub title: Vec<String>,
    /// Creator user keys.
    #[serde(default)]
    pub creator: Vec<String>,
    /// User key of the depositor.
    pub depositor: Option<String>,
    /// Free-text descriptions.
    #[serde(default)]
    pub description: Vec<String>,
    /// Subject keywords.
    #[serde(default)]
    pub keyword: Vec<String>,
    /// License statements.
    #[serde(default)]
    pub license: Vec<String>,
    /// When the content was first deposited.
    pub date_uploaded: Option<DateTime<Utc>>,
    /// When metadata or content last changed.
    pub date_modified: Option<DateTime<Utc>>,
    /// Explicit visibility; `None` until assigned or inherited from the parent work.
    pub visibility: Option<Visibility>,
    /// Active embargo, if any.
    pub embargo: Option<Embargo>,
    /// Active lease, if any.
    pub lease: Option<Lease>,
    /// Remote location the content was imported from.
    pub import_url: Option<Url>,
    /// Explicit grants.
    #[serde(default)]
    pub permissions: Permissions,
}

impl FileSet {
    /// Unsaved, empty file set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the remote location the content will be fetched from.
    #[must_use]
    pub fn with_import_url(mut self, url: Url) -> Self {
        self.import_url = Some(url);
        self
    }

    /// Whether the store has assigned an identifier.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Stamp the depositor and grant them edit rights.
    pub fn apply_depositor_metadata(&mut self, user: &User) {
        self.depositor = Some(user.user_key.clone());
        self.permissions.edit_users.insert(user.user_key.clone());
    }

    /// Fill in the label (when absent) and the title (when empty).
    pub fn assign_default_label(&mut self, label: impl FnOnce() -> String) {
        if self.label.as_deref().is_none_or(str::is_empty) {
            self.label = Some(label());
        }
        if self.title.iter().all(|title| title.trim().is_empty()) {
            self.title = self.label.iter().cloned().collect();
        }
    }

    /// Validate the record before persisting it.
    #[must_use]
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        if self.title.is_empty() {
            errors.add("title", "can't be blank");
        }
        if self.title.iter().any(|title| title.trim().is_empty()) {
            errors.add("title", "can't contain blank entries");
        }
        errors
    }
}

/// Aggregate root holding an ordered list of member file sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    /// Identifier, assigned at construction.
    pub id: WorkId,
    /// Optimistic-lock version; `0` means never persisted.
    #[serde(default)]
    pub version: u64,
    /// Titles.
    #[serde(default)]
    pub title: Vec<String>,
    /// User key of the depositor.
    pub depositor: Option<String>,
    /// Ordered member file set identifiers.
    #[serde(default)]
    pub member_ids: Vec<FileSetId>,
    /// File set used for default display.
    pub representative_id: Option<FileSetId>,
    /// File set used for the thumbnail.
    pub thumbnail_id: Option<FileSetId>,
    /// Visibility inherited by members without explicit settings.
    pub visibility: Visibility,
    /// Explicit grants propagated to members.
    #[serde(default)]
    pub permissions: Permissions,
    /// When the work last changed.
    pub date_modified: Option<DateTime<Utc>>,
}

impl Work {
    /// Unsaved work with a freshly minted identifier and restricted visibility.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: WorkId::generate(),
            version: 0,
            title: vec![title.into()],
            depositor: None,
            member_ids: Vec::new(),
            representative_id: None,
            thumbnail_id: None,
            visibility: Visibility::Restricted,
            permissions: Permissions::default(),
            date_modified: None,
        }
    }

    /// Override the visibility.
    #[must_use]
    pub const fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Whether the work has been saved at least once.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.version > 0
    }

    /// Whether `id` is one of the members.
    #[must_use]
    pub fn has_member(&self, id: FileSetId) -> bool {
        self.member_ids.contains(&id)
    }

    /// Validate the record before persisting it.
    #[must_use]
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        if self.title.iter().all(|title| title.trim().is_empty()) {
            errors.add("title", "can't be blank");
        }
        for (field, reference) in [
            ("representative_id", self.representative_id),
            ("thumbnail_id", self.thumbnail_id),
        ] {
            if reference.is_some_and(|id| !self.has_member(id)) {
                errors.add(field, "must reference a member");
            }
        }
        errors
    }
}
