//! Persistence port for the tenancy store (C4). Implemented by the
//! `storage` crate against Postgres; `service.rs` depends only on this
//! trait, never on `sqlx` directly.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::TenancyError;
use crate::model::{Organization, OrganizationMember, Project, Role};

#[async_trait]
pub trait TenancyRepository: Send + Sync {
    /// Insert an organization together with its founding owner membership
    /// in a single atomic unit, so the "an organization always has exactly
    /// one owner" invariant is never observable as violated.
    async fn insert_organization_with_owner(
        &self,
        org: &Organization,
        owner: &OrganizationMember,
    ) -> Result<(), TenancyError>;

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, TenancyError>;
    async fn find_organization_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Organization>, TenancyError>;
    async fn update_organization(&self, org: &Organization) -> Result<(), TenancyError>;
    async fn delete_organization(&self, id: Uuid) -> Result<(), TenancyError>;

    async fn insert_member(&self, member: &OrganizationMember) -> Result<(), TenancyError>;
    async fn find_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationMember>, TenancyError>;
    async fn list_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMember>, TenancyError>;
    async fn update_member_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<(), TenancyError>;
    async fn delete_member(&self, organization_id: Uuid, user_id: Uuid)
        -> Result<(), TenancyError>;

    async fn insert_project(&self, project: &Project) -> Result<(), TenancyError>;
    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, TenancyError>;
    async fn find_project_by_slug(
        &self,
        organization_id: Uuid,
        slug: &str,
    ) -> Result<Option<Project>, TenancyError>;
    async fn find_project_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<Option<Project>, TenancyError>;
    async fn update_project(&self, project: &Project) -> Result<(), TenancyError>;
    async fn delete_project(&self, id: Uuid) -> Result<(), TenancyError>;
    async fn list_projects(&self, organization_id: Uuid) -> Result<Vec<Project>, TenancyError>;
}
