//! Domain types shared by actors, stores, and deferred tasks.

mod content;
mod params;
mod resources;
mod task;

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use content::{ContentDescriptor, ContentSource, ContentVersion, NewContentVersion, Relation};
pub use params::{FileSetAttributes, FileSetParams};
pub use resources::{
    Embargo, FieldError, FileSet, Lease, Permissions, ValidationErrors, Visibility, Work,
};
pub use task::{Task, TaskHandle};

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Underlying UUID value.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                Display::fmt(&self.0, formatter)
            }
        }
    };
}

resource_id!(
    /// Identifier of a persisted file set.
    FileSetId
);
resource_id!(
    /// Identifier of a work (assigned at construction, before first save).
    WorkId
);
resource_id!(
    /// Identifier of a persisted content descriptor.
    DescriptorId
);

/// Acting user passed through actors to stores, callbacks and abilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user key (typically an email or login).
    pub user_key: String,
    /// Groups the user belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Whether the user holds repository-wide administrative rights.
    #[serde(default)]
    pub admin: bool,
}

impl User {
    /// Build a regular user with no group memberships.
    #[must_use]
    pub fn new(user_key: impl Into<String>) -> Self {
        Self {
            user_key: user_key.into(),
            groups: Vec::new(),
            admin: false,
        }
    }

    /// Attach group memberships to the user.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the user as an administrator.
    #[must_use]
    pub const fn administrator(mut self) -> Self {
        self.admin = true;
        self
    }
}
