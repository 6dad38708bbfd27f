//! Permission-list backed authorization.

use std::sync::Arc;

use deposit_core::{Ability, AbilityProvider, FileSet, User};

/// Grants edit rights from the file set's explicit grants or administrator status.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionAbilityProvider;

struct PermissionAbility {
    user: User,
}

impl Ability for PermissionAbility {
    fn can_edit(&self, file_set: &FileSet) -> bool {
        self.user.admin || file_set.permissions.allows_edit(&self.user)
    }
}

impl AbilityProvider for PermissionAbilityProvider {
    fn ability_for(&self, user: &User) -> Arc<dyn Ability> {
        Arc::new(PermissionAbility { user: user.clone() })
    }
}
