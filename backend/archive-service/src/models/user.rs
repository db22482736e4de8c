use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::middleware::Role;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub google_id: String,
    pub email: String,
    pub name: String,
    pub profile_pic: Option<String>,
    pub role: String,
    pub date_created: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::User)
    }
}

/// Identity fields taken from a verified Google profile
#[derive(Debug, Clone)]
pub struct UpsertUser {
    pub google_id: String,
    pub email: String,
    pub name: String,
    pub profile_pic: Option<String>,
}
