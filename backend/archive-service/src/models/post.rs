use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Approved,
    Denied,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Approved => "approved",
            PostStatus::Denied => "denied",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "pending" => Some(PostStatus::Pending),
            "approved" => Some(PostStatus::Approved),
            "denied" => Some(PostStatus::Denied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Document => "document",
        }
    }
}

/// Post joined with its tag name and author profile
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub tag_id: Option<i64>,
    pub user_id: Option<i64>,
    pub status: String,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    pub tag_name: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub author_profile_pic: Option<String>,
}

impl PostRow {
    pub fn status(&self) -> PostStatus {
        PostStatus::parse(&self.status).unwrap_or(PostStatus::Pending)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub post_id: i64,
    pub url: String,
    pub media_type: String,
    pub storage_key: String,
    pub filename: String,
    pub caption: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PostWithMedia {
    pub post: PostRow,
    pub media: Vec<Media>,
}

/// A file already written to the media store, waiting for its row
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub url: String,
    pub media_type: MediaType,
    pub storage_key: String,
    pub filename: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub tag_id: Option<i64>,
    pub user_id: i64,
    pub media: Vec<NewMedia>,
}

/// `tag_id: Some(None)` clears the tag
#[derive(Debug, Clone, Default)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tag_id: Option<Option<i64>>,
}
