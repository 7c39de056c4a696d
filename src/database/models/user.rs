use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::UserId;

/// Account row. The bcrypt hash is loaded for login checks but never serialised.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub nickname: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written on create and on profile update; `password` is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nickname: String,
    pub email: String,
    pub password: String,
}
