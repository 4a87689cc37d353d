//! Persistence port for user accounts. Implemented by the `storage` crate
//! against Postgres; `service.rs` depends only on this trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AuthError;
use crate::model::UserRecord;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &UserRecord) -> Result<(), AuthError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;
    async fn update(&self, user: &UserRecord) -> Result<(), AuthError>;
}
