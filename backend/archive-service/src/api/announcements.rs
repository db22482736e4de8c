use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{Announcement, CreateAnnouncement, UpdateAnnouncement};
use crate::services::AnnouncementService;
use crate::utils::deserialize_some;
use crate::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/announcements", get(list_live))
}

/// Writes; mounted behind the admin guard
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/announcements", post(create_announcement))
        .route(
            "/announcements/:id",
            put(update_announcement).delete(delete_announcement),
        )
}

#[derive(Debug, Serialize)]
pub struct AnnouncementAuthor {
    pub id: Option<i64>,
    pub name: String,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnnouncementResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub date_created: String,
    pub date_start: String,
    pub date_end: Option<String>,
    pub is_active: bool,
    pub user: AnnouncementAuthor,
}

impl From<Announcement> for AnnouncementResponse {
    fn from(a: Announcement) -> Self {
        Self {
            id: a.id,
            title: a.title,
            content: a.content,
            date_created: a.date_created.to_rfc3339(),
            date_start: a.date_start.to_rfc3339(),
            date_end: a.date_end.map(|d| d.to_rfc3339()),
            is_active: a.is_active,
            user: AnnouncementAuthor {
                id: a.user_id,
                name: a.author_name.unwrap_or_else(|| "Admin".to_string()),
                profile_pic: a.author_profile_pic,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnnouncementEnvelope {
    pub announcement: AnnouncementResponse,
}

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    pub since: Option<String>,
}

/// An unencoded `+hh:mm` offset arrives with the `+` decoded to a space
fn parse_since(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    DateTime::parse_from_rfc3339(s)
        .or_else(|e| match s.contains(' ') {
            true => DateTime::parse_from_rfc3339(&s.replace(' ', "+")),
            false => Err(e),
        })
        .map(|d| Some(d.with_timezone(&Utc)))
        .map_err(|_| {
            AppError::BadRequest(
                "since must be an RFC 3339 timestamp, e.g. 2024-05-01T12:00:00Z".to_string(),
            )
        })
}

async fn list_live(
    State(state): State<AppState>,
    Query(query): Query<LiveQuery>,
) -> Result<Json<Vec<AnnouncementResponse>>> {
    let since = parse_since(query.since.as_deref())?;
    let announcements = AnnouncementService::new(state.db.clone())
        .list_live(since)
        .await?;

    Ok(Json(
        announcements
            .into_iter()
            .map(AnnouncementResponse::from)
            .collect(),
    ))
}

pub async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<AnnouncementResponse>>> {
    let announcements = AnnouncementService::new(state.db.clone()).list_all().await?;

    Ok(Json(
        announcements
            .into_iter()
            .map(AnnouncementResponse::from)
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub content: String,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

async fn create_announcement(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<AnnouncementEnvelope>)> {
    let announcement = AnnouncementService::new(state.db.clone())
        .create(CreateAnnouncement {
            user_id: current_user.id,
            title: payload.title,
            content: payload.content,
            date_start: payload.date_start.unwrap_or_else(Utc::now),
            date_end: payload.date_end,
            is_active: payload.is_active.unwrap_or(true),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AnnouncementEnvelope {
            announcement: announcement.into(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub date_end: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

async fn update_announcement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAnnouncementRequest>,
) -> Result<Json<AnnouncementEnvelope>> {
    let announcement = AnnouncementService::new(state.db.clone())
        .update(
            id,
            UpdateAnnouncement {
                title: payload.title,
                content: payload.content,
                date_start: payload.date_start,
                date_end: payload.date_end,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(AnnouncementEnvelope {
        announcement: announcement.into(),
    }))
}

async fn delete_announcement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    AnnouncementService::new(state.db.clone()).delete(id).await?;
    Ok(Json(json!({ "success": true })))
}
