//! Authorization Resolver (C6): the single place that answers "does this
//! role suffice for this operation" (§4.6). DSN→project resolution lives in
//! [`crate::dsn`]; membership lookup is the caller's (repository's) job —
//! this module only encodes the role-threshold table once membership and
//! role are already known.

use crate::error::TenancyError;
use crate::model::Role;

/// One of the operations §4.6's table gates by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Read org details, list projects, list issues.
    ReadOrganization,
    /// Update org, create/update/delete project, regenerate project keys.
    ManageProjects,
    /// Remove a member holding the `member` role.
    RemoveMember,
    /// Delete org, change a member's role, promote to admin, remove an admin.
    ManageOrganization,
}

impl Permission {
    /// The minimum role that grants this permission. Roles are totally
    /// ordered (`Member < Admin < Owner`) so "admin and up" falls out of a
    /// single `>=` comparison — owner never needs to be listed separately.
    #[must_use]
    pub const fn required_role(self) -> Role {
        match self {
            Self::ReadOrganization => Role::Member,
            Self::ManageProjects | Self::RemoveMember => Role::Admin,
            Self::ManageOrganization => Role::Owner,
        }
    }
}

/// Check whether `actor_role` grants `permission`.
///
/// # Errors
/// Returns [`TenancyError::Forbidden`] when the role falls short.
pub fn authorize(actor_role: Role, permission: Permission) -> Result<(), TenancyError> {
    let required = permission.required_role();
    if actor_role >= required {
        Ok(())
    } else {
        Err(TenancyError::Forbidden(format!(
            "requires {required} role, caller has {actor_role}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_satisfies_every_permission() {
        for permission in [
            Permission::ReadOrganization,
            Permission::ManageProjects,
            Permission::RemoveMember,
            Permission::ManageOrganization,
        ] {
            assert!(authorize(Role::Owner, permission).is_ok());
        }
    }

    #[test]
    fn member_cannot_manage_projects_or_organization() {
        assert!(authorize(Role::Member, Permission::ManageProjects).is_err());
        assert!(authorize(Role::Member, Permission::ManageOrganization).is_err());
        assert!(authorize(Role::Member, Permission::ReadOrganization).is_ok());
    }

    #[test]
    fn admin_manages_projects_but_not_the_organization() {
        assert!(authorize(Role::Admin, Permission::ManageProjects).is_ok());
        assert!(authorize(Role::Admin, Permission::ManageOrganization).is_err());
    }
}
