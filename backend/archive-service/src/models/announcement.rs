use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Announcement joined with its author's display fields
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Announcement {
    pub id: i64,
    pub user_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub date_created: DateTime<Utc>,
    pub date_start: DateTime<Utc>,
    pub date_end: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub author_name: Option<String>,
    pub author_profile_pic: Option<String>,
}

impl Announcement {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.date_start <= now && self.date_end.map_or(true, |end| end > now)
    }
}

#[derive(Debug, Clone)]
pub struct CreateAnnouncement {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub date_start: DateTime<Utc>,
    pub date_end: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// `date_end: Some(None)` removes the expiry
#[derive(Debug, Clone, Default)]
pub struct UpdateAnnouncement {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}
