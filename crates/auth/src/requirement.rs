use serde::Serialize;

use crate::role::Role;

/// Access requirement declared by a screen when it is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "roles", rename_all = "snake_case")]
pub enum AccessRequirement {
    /// Anyone, signed in or not.
    Public,
    /// Any signed-in identity; the role is not consulted.
    Authenticated,
    /// Signed in with one of these roles, or admin.
    RoleIn(&'static [Role]),
}

impl AccessRequirement {
    pub const ADMIN: AccessRequirement = AccessRequirement::RoleIn(&[Role::Admin]);
    pub const FINANCE: AccessRequirement = AccessRequirement::RoleIn(&[Role::Finance, Role::Admin]);
    pub const COMMERCIAL: AccessRequirement =
        AccessRequirement::RoleIn(&[Role::Commercial, Role::Admin]);

    pub fn needs_identity(&self) -> bool {
        !matches!(self, AccessRequirement::Public)
    }

    pub fn needs_role(&self) -> bool {
        matches!(self, AccessRequirement::RoleIn(_))
    }

    /// The single requirement-satisfaction predicate.
    pub fn is_satisfied_by(&self, role: Role) -> bool {
        match self {
            AccessRequirement::Public | AccessRequirement::Authenticated => true,
            AccessRequirement::RoleIn(allowed) => role.satisfies(allowed),
        }
    }
}
