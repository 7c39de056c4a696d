use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::UserId;

/// A resource path a subscriber asked for, tied to their subscription
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubscriptionReport {
    pub id: i64,
    pub path: String,
    pub author_id: UserId,
    pub profile_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub path: String,
    pub author_id: UserId,
    pub profile_id: i64,
}
