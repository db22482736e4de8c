use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Contact-form submission
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub date_created: DateTime<Utc>,
    pub resolved: bool,
}
