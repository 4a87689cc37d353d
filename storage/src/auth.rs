//! Postgres adapter for [`vigil_auth::UserRepository`].

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;
use vigil_auth::{AuthError, UserRecord, UserRepository};

use crate::error::{classify, SqlFailure};

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &sqlx::postgres::PgRow) -> UserRecord {
        UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            display_name: row.get("display_name"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &UserRecord) -> Result<(), AuthError> {
        sqlx::query(
            r"
            INSERT INTO users (id, email, password_hash, display_name, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match classify(&e) {
            SqlFailure::UniqueViolation => AuthError::EmailExists,
            SqlFailure::Other(msg) => AuthError::Internal(msg),
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(row.as_ref().map(Self::row_to_user))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(row.as_ref().map(Self::row_to_user))
    }

    async fn update(&self, user: &UserRecord) -> Result<(), AuthError> {
        sqlx::query(
            r"
            UPDATE users
            SET email = $1, password_hash = $2, display_name = $3, is_active = $4, updated_at = $5
            WHERE id = $6
            ",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.is_active)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| match classify(&e) {
            SqlFailure::UniqueViolation => AuthError::EmailExists,
            SqlFailure::Other(msg) => AuthError::Internal(msg),
        })?;
        Ok(())
    }
}
