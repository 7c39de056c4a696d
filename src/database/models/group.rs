use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A role bucket ("admin", "user") that holds permissions
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserGroup {
    pub id: i64,
    pub name: String,
    pub email: String,
}
