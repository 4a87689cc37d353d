//! The User entity (§3). Other crates reference users only by `Uuid`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(id: Uuid, email: String, password_hash: String, display_name: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email,
            password_hash,
            display_name,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
