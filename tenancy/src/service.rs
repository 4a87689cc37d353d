//! Tenancy Store operations (C4), orchestrating [`crate::repository`]
//! against the role-threshold table in [`crate::authz`].

use uuid::Uuid;
use vigil_core::Clock;

use crate::authz::{authorize, Permission};
use crate::dsn;
use crate::error::TenancyError;
use crate::model::{Organization, OrganizationMember, Platform, Project, Role};
use crate::repository::TenancyRepository;
use crate::slug;

fn require<T>(found: Option<T>, what: &'static str) -> Result<T, TenancyError> {
    found.ok_or(TenancyError::NotFound(what))
}

/// Create an organization; the creator becomes its owner.
///
/// # Errors
/// [`TenancyError::Validation`] for a malformed slug/name; [`TenancyError::Conflict`]
/// if the slug is already taken.
pub async fn create_organization(
    repo: &dyn TenancyRepository,
    clock: &dyn Clock,
    owner_user_id: Uuid,
    name: &str,
    raw_slug: &str,
    description: Option<String>,
) -> Result<Organization, TenancyError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TenancyError::Validation("name must not be empty".to_string()));
    }
    let normalized_slug = slug::normalize(raw_slug)?;
    if repo.find_organization_by_slug(&normalized_slug).await?.is_some() {
        return Err(TenancyError::Conflict(format!(
            "organization slug {normalized_slug:?} already exists"
        )));
    }

    let now = clock.now();
    let org = Organization {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: normalized_slug,
        description,
        created_at: now,
        updated_at: now,
    };
    let owner = OrganizationMember {
        id: Uuid::new_v4(),
        organization_id: org.id,
        user_id: owner_user_id,
        role: Role::Owner,
        joined_at: now,
    };
    repo.insert_organization_with_owner(&org, &owner).await?;
    Ok(org)
}

/// Update an organization's name/description. Requires admin or owner.
///
/// # Errors
/// [`TenancyError::Forbidden`] if `actor_role` is below admin; [`TenancyError::NotFound`]
/// if the organization doesn't exist.
pub async fn update_organization(
    repo: &dyn TenancyRepository,
    clock: &dyn Clock,
    actor_role: Role,
    organization_id: Uuid,
    name: Option<String>,
    description: Option<Option<String>>,
) -> Result<Organization, TenancyError> {
    authorize(actor_role, Permission::ManageProjects)?;
    let mut org = require(repo.find_organization(organization_id).await?, "organization")?;
    if let Some(name) = name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(TenancyError::Validation("name must not be empty".to_string()));
        }
        org.name = name;
    }
    if let Some(description) = description {
        org.description = description;
    }
    org.updated_at = clock.now();
    repo.update_organization(&org).await?;
    Ok(org)
}

/// Delete an organization. Requires owner.
///
/// # Errors
/// [`TenancyError::Forbidden`] if `actor_role` isn't owner.
pub async fn delete_organization(
    repo: &dyn TenancyRepository,
    actor_role: Role,
    organization_id: Uuid,
) -> Result<(), TenancyError> {
    authorize(actor_role, Permission::ManageOrganization)?;
    require(repo.find_organization(organization_id).await?, "organization")?;
    repo.delete_organization(organization_id).await
}

/// Add a member to an organization. Requires admin or owner; a member can
/// never be added directly as owner (§4.6).
///
/// # Errors
/// [`TenancyError::Forbidden`] for an insufficient role or an attempted
/// owner grant; [`TenancyError::Conflict`] if the user is already a member.
pub async fn add_member(
    repo: &dyn TenancyRepository,
    clock: &dyn Clock,
    actor_role: Role,
    organization_id: Uuid,
    user_id: Uuid,
    role: Role,
) -> Result<OrganizationMember, TenancyError> {
    authorize(actor_role, Permission::ManageProjects)?;
    if role == Role::Owner {
        return Err(TenancyError::Forbidden(
            "cannot grant owner role via add-member".to_string(),
        ));
    }
    if repo.find_member(organization_id, user_id).await?.is_some() {
        return Err(TenancyError::Conflict("user is already a member".to_string()));
    }
    let member = OrganizationMember {
        id: Uuid::new_v4(),
        organization_id,
        user_id,
        role,
        joined_at: clock.now(),
    };
    repo.insert_member(&member).await?;
    Ok(member)
}

/// Change a member's role. Requires owner; never targets or grants owner.
///
/// # Errors
/// [`TenancyError::Forbidden`] if the actor isn't owner or the change would
/// touch the owner role; [`TenancyError::NotFound`] if the member doesn't exist.
pub async fn change_member_role(
    repo: &dyn TenancyRepository,
    actor_role: Role,
    organization_id: Uuid,
    user_id: Uuid,
    new_role: Role,
) -> Result<(), TenancyError> {
    authorize(actor_role, Permission::ManageOrganization)?;
    let member = require(
        repo.find_member(organization_id, user_id).await?,
        "member",
    )?;
    if member.role == Role::Owner || new_role == Role::Owner {
        return Err(TenancyError::Forbidden(
            "the owner role can't be reassigned through this operation".to_string(),
        ));
    }
    repo.update_member_role(organization_id, user_id, new_role).await
}

/// Remove a member. Removing an admin requires owner; removing a plain
/// member requires admin or owner. The owner can never be removed.
///
/// # Errors
/// [`TenancyError::Forbidden`] for an insufficient role or an attempt to
/// remove the owner; [`TenancyError::NotFound`] if the member doesn't exist.
pub async fn remove_member(
    repo: &dyn TenancyRepository,
    actor_role: Role,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<(), TenancyError> {
    let member = require(
        repo.find_member(organization_id, user_id).await?,
        "member",
    )?;
    match member.role {
        Role::Owner => {
            return Err(TenancyError::Forbidden("the owner cannot be removed".to_string()))
        }
        Role::Admin => authorize(actor_role, Permission::ManageOrganization)?,
        Role::Member => authorize(actor_role, Permission::RemoveMember)?,
    }
    repo.delete_member(organization_id, user_id).await
}

/// Create a project. Requires admin or owner on the parent organization.
///
/// # Errors
/// [`TenancyError::Validation`] for a malformed slug/name; [`TenancyError::Conflict`]
/// if the slug is already used within the organization.
#[allow(clippy::too_many_arguments)]
pub async fn create_project(
    repo: &dyn TenancyRepository,
    clock: &dyn Clock,
    dsn_host: &str,
    actor_role: Role,
    organization_id: Uuid,
    name: &str,
    raw_slug: &str,
    platform: Platform,
    description: Option<String>,
) -> Result<Project, TenancyError> {
    authorize(actor_role, Permission::ManageProjects)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(TenancyError::Validation("name must not be empty".to_string()));
    }
    let normalized_slug = slug::normalize(raw_slug)?;
    if repo
        .find_project_by_slug(organization_id, &normalized_slug)
        .await?
        .is_some()
    {
        return Err(TenancyError::Conflict(format!(
            "project slug {normalized_slug:?} already exists in this organization"
        )));
    }

    let id = Uuid::new_v4();
    let public_key = dsn::generate_key();
    let secret_key = dsn::generate_key();
    let now = clock.now();
    let project = Project {
        id,
        organization_id,
        name: name.to_string(),
        slug: normalized_slug,
        description,
        platform,
        dsn: dsn::build(dsn_host, &public_key, id),
        public_key,
        secret_key,
        active: true,
        created_at: now,
        updated_at: now,
    };
    repo.insert_project(&project).await?;
    Ok(project)
}

/// Regenerate a project's keys, atomically replacing public key, secret
/// key, and DSN. Requires admin or owner.
///
/// # Errors
/// [`TenancyError::Forbidden`] if the role is insufficient; [`TenancyError::NotFound`]
/// if the project doesn't exist.
pub async fn regenerate_keys(
    repo: &dyn TenancyRepository,
    clock: &dyn Clock,
    dsn_host: &str,
    actor_role: Role,
    project_id: Uuid,
) -> Result<Project, TenancyError> {
    authorize(actor_role, Permission::ManageProjects)?;
    let mut project = require(repo.find_project(project_id).await?, "project")?;
    project.public_key = dsn::generate_key();
    project.secret_key = dsn::generate_key();
    project.dsn = dsn::build(dsn_host, &project.public_key, project.id);
    project.updated_at = clock.now();
    repo.update_project(&project).await?;
    Ok(project)
}

/// Deactivate or reactivate a project without touching its keys. Requires
/// admin or owner.
///
/// # Errors
/// [`TenancyError::Forbidden`] if the role is insufficient; [`TenancyError::NotFound`]
/// if the project doesn't exist.
pub async fn set_project_active(
    repo: &dyn TenancyRepository,
    clock: &dyn Clock,
    actor_role: Role,
    project_id: Uuid,
    active: bool,
) -> Result<Project, TenancyError> {
    authorize(actor_role, Permission::ManageProjects)?;
    let mut project = require(repo.find_project(project_id).await?, "project")?;
    project.active = active;
    project.updated_at = clock.now();
    repo.update_project(&project).await?;
    Ok(project)
}

/// Delete a project and everything it cascades to. Requires admin or owner.
///
/// # Errors
/// [`TenancyError::Forbidden`] if the role is insufficient; [`TenancyError::NotFound`]
/// if the project doesn't exist.
pub async fn delete_project(
    repo: &dyn TenancyRepository,
    actor_role: Role,
    project_id: Uuid,
) -> Result<(), TenancyError> {
    authorize(actor_role, Permission::ManageProjects)?;
    require(repo.find_project(project_id).await?, "project")?;
    repo.delete_project(project_id).await
}

/// Resolve "does user U have access to project P, and with which role?"
/// (§4.6, question 1).
///
/// # Errors
/// [`TenancyError::NotFound`] if the project doesn't exist; [`TenancyError::Forbidden`]
/// if the user has no membership in the project's organization.
pub async fn resolve_user_project_role(
    repo: &dyn TenancyRepository,
    user_id: Uuid,
    project_id: Uuid,
) -> Result<(Project, Role), TenancyError> {
    let project = require(repo.find_project(project_id).await?, "project")?;
    let member = repo
        .find_member(project.organization_id, user_id)
        .await?
        .ok_or_else(|| TenancyError::Forbidden("not a member of this organization".to_string()))?;
    Ok((project, member.role))
}

/// Resolve "does this DSN/publicKey identify an active project?" (§4.6,
/// question 2).
///
/// # Errors
/// [`TenancyError::InvalidDsn`] if the credential doesn't parse or resolve to
/// a known project; [`TenancyError::Forbidden`] if the project is inactive.
pub async fn resolve_project_by_credential(
    repo: &dyn TenancyRepository,
    credential: &str,
) -> Result<Project, TenancyError> {
    let parsed = dsn::parse(credential)?;
    let project = repo
        .find_project_by_public_key(&parsed.public_key)
        .await?
        .ok_or_else(|| TenancyError::InvalidDsn("unknown public key".to_string()))?;
    if let Some(expected_id) = parsed.project_id {
        if expected_id != project.id {
            return Err(TenancyError::InvalidDsn(
                "project id does not match public key".to_string(),
            ));
        }
    }
    if !project.active {
        return Err(TenancyError::Forbidden("project is inactive".to_string()));
    }
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use vigil_core::FixedClock;

    #[derive(Default)]
    struct InMemoryRepo {
        organizations: Mutex<HashMap<Uuid, Organization>>,
        members: Mutex<HashMap<(Uuid, Uuid), OrganizationMember>>,
        projects: Mutex<HashMap<Uuid, Project>>,
    }

    #[async_trait::async_trait]
    impl TenancyRepository for InMemoryRepo {
        async fn insert_organization_with_owner(
            &self,
            org: &Organization,
            owner: &OrganizationMember,
        ) -> Result<(), TenancyError> {
            self.organizations.lock().unwrap().insert(org.id, org.clone());
            self.members
                .lock()
                .unwrap()
                .insert((owner.organization_id, owner.user_id), owner.clone());
            Ok(())
        }

        async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, TenancyError> {
            Ok(self.organizations.lock().unwrap().get(&id).cloned())
        }

        async fn find_organization_by_slug(
            &self,
            slug: &str,
        ) -> Result<Option<Organization>, TenancyError> {
            Ok(self
                .organizations
                .lock()
                .unwrap()
                .values()
                .find(|o| o.slug == slug)
                .cloned())
        }

        async fn update_organization(&self, org: &Organization) -> Result<(), TenancyError> {
            self.organizations.lock().unwrap().insert(org.id, org.clone());
            Ok(())
        }

        async fn delete_organization(&self, id: Uuid) -> Result<(), TenancyError> {
            self.organizations.lock().unwrap().remove(&id);
            Ok(())
        }

        async fn insert_member(&self, member: &OrganizationMember) -> Result<(), TenancyError> {
            self.members
                .lock()
                .unwrap()
                .insert((member.organization_id, member.user_id), member.clone());
            Ok(())
        }

        async fn find_member(
            &self,
            organization_id: Uuid,
            user_id: Uuid,
        ) -> Result<Option<OrganizationMember>, TenancyError> {
            Ok(self
                .members
                .lock()
                .unwrap()
                .get(&(organization_id, user_id))
                .cloned())
        }

        async fn list_members(
            &self,
            organization_id: Uuid,
        ) -> Result<Vec<OrganizationMember>, TenancyError> {
            Ok(self
                .members
                .lock()
                .unwrap()
                .values()
                .filter(|m| m.organization_id == organization_id)
                .cloned()
                .collect())
        }

        async fn update_member_role(
            &self,
            organization_id: Uuid,
            user_id: Uuid,
            role: Role,
        ) -> Result<(), TenancyError> {
            if let Some(m) = self.members.lock().unwrap().get_mut(&(organization_id, user_id)) {
                m.role = role;
            }
            Ok(())
        }

        async fn delete_member(
            &self,
            organization_id: Uuid,
            user_id: Uuid,
        ) -> Result<(), TenancyError> {
            self.members.lock().unwrap().remove(&(organization_id, user_id));
            Ok(())
        }

        async fn insert_project(&self, project: &Project) -> Result<(), TenancyError> {
            self.projects.lock().unwrap().insert(project.id, project.clone());
            Ok(())
        }

        async fn find_project(&self, id: Uuid) -> Result<Option<Project>, TenancyError> {
            Ok(self.projects.lock().unwrap().get(&id).cloned())
        }

        async fn find_project_by_slug(
            &self,
            organization_id: Uuid,
            slug: &str,
        ) -> Result<Option<Project>, TenancyError> {
            Ok(self
                .projects
                .lock()
                .unwrap()
                .values()
                .find(|p| p.organization_id == organization_id && p.slug == slug)
                .cloned())
        }

        async fn find_project_by_public_key(
            &self,
            public_key: &str,
        ) -> Result<Option<Project>, TenancyError> {
            Ok(self
                .projects
                .lock()
                .unwrap()
                .values()
                .find(|p| p.public_key == public_key)
                .cloned())
        }

        async fn update_project(&self, project: &Project) -> Result<(), TenancyError> {
            self.projects.lock().unwrap().insert(project.id, project.clone());
            Ok(())
        }

        async fn delete_project(&self, id: Uuid) -> Result<(), TenancyError> {
            self.projects.lock().unwrap().remove(&id);
            Ok(())
        }

        async fn list_projects(&self, organization_id: Uuid) -> Result<Vec<Project>, TenancyError> {
            Ok(self
                .projects
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.organization_id == organization_id)
                .cloned()
                .collect())
        }
    }

    fn clock() -> FixedClock {
        FixedClock::new(chrono::Utc::now())
    }

    #[tokio::test]
    async fn creating_an_organization_makes_the_creator_owner() {
        let repo = InMemoryRepo::default();
        let user_id = Uuid::new_v4();
        let org = create_organization(&repo, &clock(), user_id, "Acme", "acme", None)
            .await
            .unwrap();
        let member = repo.find_member(org.id, user_id).await.unwrap().unwrap();
        assert_eq!(member.role, Role::Owner);
    }

    #[tokio::test]
    async fn duplicate_organization_slug_is_rejected() {
        let repo = InMemoryRepo::default();
        create_organization(&repo, &clock(), Uuid::new_v4(), "Acme", "acme", None)
            .await
            .unwrap();
        let err = create_organization(&repo, &clock(), Uuid::new_v4(), "Acme Two", "acme", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::Conflict(_)));
    }

    #[tokio::test]
    async fn cannot_add_member_as_owner() {
        let repo = InMemoryRepo::default();
        let org = create_organization(&repo, &clock(), Uuid::new_v4(), "Acme", "acme", None)
            .await
            .unwrap();
        let err = add_member(&repo, &clock(), Role::Owner, org.id, Uuid::new_v4(), Role::Owner)
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::Forbidden(_)));
    }

    #[tokio::test]
    async fn member_role_cannot_update_projects() {
        let repo = InMemoryRepo::default();
        let org = create_organization(&repo, &clock(), Uuid::new_v4(), "Acme", "acme", None)
            .await
            .unwrap();
        let err = create_project(
            &repo,
            &clock(),
            "errors.example.com",
            Role::Member,
            org.id,
            "Web",
            "web",
            Platform::Javascript,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TenancyError::Forbidden(_)));
    }

    #[tokio::test]
    async fn owner_cannot_be_removed() {
        let repo = InMemoryRepo::default();
        let owner_id = Uuid::new_v4();
        let org = create_organization(&repo, &clock(), owner_id, "Acme", "acme", None)
            .await
            .unwrap();
        let err = remove_member(&repo, Role::Owner, org.id, owner_id).await.unwrap_err();
        assert!(matches!(err, TenancyError::Forbidden(_)));
    }

    #[tokio::test]
    async fn resolves_active_project_by_dsn() {
        let repo = InMemoryRepo::default();
        let org = create_organization(&repo, &clock(), Uuid::new_v4(), "Acme", "acme", None)
            .await
            .unwrap();
        let project = create_project(
            &repo,
            &clock(),
            "errors.example.com",
            Role::Owner,
            org.id,
            "Web",
            "web",
            Platform::Javascript,
            None,
        )
        .await
        .unwrap();
        let resolved = resolve_project_by_credential(&repo, &project.dsn).await.unwrap();
        assert_eq!(resolved.id, project.id);
    }

    #[tokio::test]
    async fn inactive_project_is_rejected_on_credential_resolution() {
        let repo = InMemoryRepo::default();
        let org = create_organization(&repo, &clock(), Uuid::new_v4(), "Acme", "acme", None)
            .await
            .unwrap();
        let project = create_project(
            &repo,
            &clock(),
            "errors.example.com",
            Role::Owner,
            org.id,
            "Web",
            "web",
            Platform::Javascript,
            None,
        )
        .await
        .unwrap();
        set_project_active(&repo, &clock(), Role::Owner, project.id, false)
            .await
            .unwrap();
        let err = resolve_project_by_credential(&repo, &project.dsn).await.unwrap_err();
        assert!(matches!(err, TenancyError::Forbidden(_)));
    }
}
