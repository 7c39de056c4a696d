use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::auth::UserId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Form {
    pub id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub form_type: String,
    pub data: Value,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated create/update payload
#[derive(Debug, Clone)]
pub struct FormDraft {
    pub form_type: String,
    pub data: Value,
    pub author_id: UserId,
}
