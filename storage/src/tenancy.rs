//! Postgres adapter for [`vigil_tenancy::TenancyRepository`].

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;
use vigil_tenancy::{Organization, OrganizationMember, Project, Role, TenancyError, TenancyRepository};

use crate::error::{classify, SqlFailure};

pub struct PgTenancyRepository {
    pool: PgPool,
}

impl PgTenancyRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_organization(row: &sqlx::postgres::PgRow) -> Organization {
        Organization {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
            description: row.get("description"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn row_to_member(row: &sqlx::postgres::PgRow) -> Result<OrganizationMember, TenancyError> {
        let role_str: String = row.get("role");
        Ok(OrganizationMember {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            user_id: row.get("user_id"),
            role: role_str.parse::<Role>()?,
            joined_at: row.get("joined_at"),
        })
    }

    fn row_to_project(row: &sqlx::postgres::PgRow) -> Result<Project, TenancyError> {
        let platform_str: String = row.get("platform");
        Ok(Project {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            name: row.get("name"),
            slug: row.get("slug"),
            description: row.get("description"),
            platform: platform_str.parse()?,
            public_key: row.get("public_key"),
            secret_key: row.get("secret_key"),
            dsn: row.get("dsn"),
            active: row.get("active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl TenancyRepository for PgTenancyRepository {
    async fn insert_organization_with_owner(
        &self,
        org: &Organization,
        owner: &OrganizationMember,
    ) -> Result<(), TenancyError> {
        let mut tx = self.pool.begin().await.map_err(|e| TenancyError::Internal(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO organizations (id, name, slug, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(org.id)
        .bind(&org.name)
        .bind(&org.slug)
        .bind(&org.description)
        .bind(org.created_at)
        .bind(org.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match classify(&e) {
            SqlFailure::UniqueViolation => TenancyError::Conflict(format!("slug {:?} already taken", org.slug)),
            SqlFailure::Other(msg) => TenancyError::Internal(msg),
        })?;

        sqlx::query(
            r"
            INSERT INTO organization_members (id, organization_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(owner.id)
        .bind(owner.organization_id)
        .bind(owner.user_id)
        .bind(owner.role.to_string())
        .bind(owner.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| TenancyError::Internal(e.to_string()))?;

        tx.commit().await.map_err(|e| TenancyError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, TenancyError> {
        let row = sqlx::query("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        Ok(row.as_ref().map(Self::row_to_organization))
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>, TenancyError> {
        let row = sqlx::query("SELECT * FROM organizations WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        Ok(row.as_ref().map(Self::row_to_organization))
    }

    async fn update_organization(&self, org: &Organization) -> Result<(), TenancyError> {
        sqlx::query(
            r"
            UPDATE organizations SET name = $1, slug = $2, description = $3, updated_at = $4
            WHERE id = $5
            ",
        )
        .bind(&org.name)
        .bind(&org.slug)
        .bind(&org.description)
        .bind(org.updated_at)
        .bind(org.id)
        .execute(&self.pool)
        .await
        .map_err(|e| match classify(&e) {
            SqlFailure::UniqueViolation => TenancyError::Conflict(format!("slug {:?} already taken", org.slug)),
            SqlFailure::Other(msg) => TenancyError::Internal(msg),
        })?;
        Ok(())
    }

    async fn delete_organization(&self, id: Uuid) -> Result<(), TenancyError> {
        sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn insert_member(&self, member: &OrganizationMember) -> Result<(), TenancyError> {
        sqlx::query(
            r"
            INSERT INTO organization_members (id, organization_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(member.id)
        .bind(member.organization_id)
        .bind(member.user_id)
        .bind(member.role.to_string())
        .bind(member.joined_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match classify(&e) {
            SqlFailure::UniqueViolation => TenancyError::Conflict("user is already a member".to_string()),
            SqlFailure::Other(msg) => TenancyError::Internal(msg),
        })?;
        Ok(())
    }

    async fn find_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationMember>, TenancyError> {
        let row = sqlx::query("SELECT * FROM organization_members WHERE organization_id = $1 AND user_id = $2")
            .bind(organization_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        row.as_ref().map(Self::row_to_member).transpose()
    }

    async fn list_members(&self, organization_id: Uuid) -> Result<Vec<OrganizationMember>, TenancyError> {
        let rows = sqlx::query("SELECT * FROM organization_members WHERE organization_id = $1 ORDER BY joined_at ASC")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        rows.iter().map(Self::row_to_member).collect()
    }

    async fn update_member_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<(), TenancyError> {
        sqlx::query("UPDATE organization_members SET role = $1 WHERE organization_id = $2 AND user_id = $3")
            .bind(role.to_string())
            .bind(organization_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn delete_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<(), TenancyError> {
        sqlx::query("DELETE FROM organization_members WHERE organization_id = $1 AND user_id = $2")
            .bind(organization_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn insert_project(&self, project: &Project) -> Result<(), TenancyError> {
        sqlx::query(
            r"
            INSERT INTO projects (
                id, organization_id, name, slug, description, platform,
                public_key, secret_key, dsn, active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(project.id)
        .bind(project.organization_id)
        .bind(&project.name)
        .bind(&project.slug)
        .bind(&project.description)
        .bind(project.platform.to_string())
        .bind(&project.public_key)
        .bind(&project.secret_key)
        .bind(&project.dsn)
        .bind(project.active)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match classify(&e) {
            SqlFailure::UniqueViolation => TenancyError::Conflict("project slug or key already in use".to_string()),
            SqlFailure::Other(msg) => TenancyError::Internal(msg),
        })?;
        Ok(())
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, TenancyError> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        row.as_ref().map(Self::row_to_project).transpose()
    }

    async fn find_project_by_slug(&self, organization_id: Uuid, slug: &str) -> Result<Option<Project>, TenancyError> {
        let row = sqlx::query("SELECT * FROM projects WHERE organization_id = $1 AND slug = $2")
            .bind(organization_id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        row.as_ref().map(Self::row_to_project).transpose()
    }

    async fn find_project_by_public_key(&self, public_key: &str) -> Result<Option<Project>, TenancyError> {
        let row = sqlx::query("SELECT * FROM projects WHERE public_key = $1")
            .bind(public_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        row.as_ref().map(Self::row_to_project).transpose()
    }

    async fn update_project(&self, project: &Project) -> Result<(), TenancyError> {
        sqlx::query(
            r"
            UPDATE projects
            SET name = $1, slug = $2, description = $3, platform = $4, active = $5, updated_at = $6
            WHERE id = $7
            ",
        )
        .bind(&project.name)
        .bind(&project.slug)
        .bind(&project.description)
        .bind(project.platform.to_string())
        .bind(project.active)
        .bind(project.updated_at)
        .bind(project.id)
        .execute(&self.pool)
        .await
        .map_err(|e| match classify(&e) {
            SqlFailure::UniqueViolation => TenancyError::Conflict("project slug already in use".to_string()),
            SqlFailure::Other(msg) => TenancyError::Internal(msg),
        })?;
        Ok(())
    }

    async fn delete_project(&self, id: Uuid) -> Result<(), TenancyError> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list_projects(&self, organization_id: Uuid) -> Result<Vec<Project>, TenancyError> {
        let rows = sqlx::query("SELECT * FROM projects WHERE organization_id = $1 ORDER BY created_at ASC")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TenancyError::Internal(e.to_string()))?;
        rows.iter().map(Self::row_to_project).collect()
    }
}
