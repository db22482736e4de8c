use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ModerationLog {
    pub id: i64,
    pub admin_id: Option<i64>,
    pub post_id: i64,
    pub action: String,
    pub feedback: Option<String>,
    pub date_of_action: DateTime<Utc>,
    pub admin_name: Option<String>,
}

#[derive(Debug)]
pub struct CreateModerationLog {
    pub admin_id: i64,
    pub post_id: i64,
    pub action: ModerationAction,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Deny,
    Edit,
    Delete,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Deny => "deny",
            ModerationAction::Edit => "edit",
            ModerationAction::Delete => "delete",
        }
    }
}
