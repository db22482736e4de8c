use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub display_order: i32,
    pub image_url: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTag {
    pub name: String,
    pub display_order: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTag {
    pub name: Option<String>,
    pub display_order: Option<i32>,
    pub image_url: Option<String>,
}
