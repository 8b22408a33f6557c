//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::User;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 128))]
    pub username: String,
    /// Credential the driver presents (RFID UID or contract id)
    #[validate(length(min = 1, max = 128))]
    pub id_token: String,
    pub token_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub id_token: String,
    pub is_active: bool,
    pub token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            id_token: u.id_token.clone(),
            is_active: u.is_active,
            token_expiry: u.token_expiry,
            created_at: u.created_at,
        }
    }
}
