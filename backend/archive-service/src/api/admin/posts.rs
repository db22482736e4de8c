use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::posts::{to_responses, PostResponse};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{ModerationLog, PostStatus, PostWithMedia, UpdatePost};
use crate::services::{
    validate_content, validate_title, BulkOutcome, MediaService, ModerationService, Page,
    PostFilters, PostService, SortOrder, TagService,
};
use crate::utils::content_preview;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;
const PREVIEW_CHARS: usize = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pending-posts", get(list_pending).post(bulk_decide))
        .route("/posts", get(list_all_posts))
        .route("/posts/:id", put(edit_post).delete(delete_post))
        .route("/posts/:id/approve", post(approve_post))
        .route("/posts/:id/deny", post(deny_post))
        .route("/posts/:id/history", get(post_history))
}

fn moderation(state: &AppState) -> ModerationService {
    ModerationService::new(
        state.db.clone(),
        state.email.clone(),
        MediaService::new(state.media.clone(), &state.config.uploads),
    )
}

async fn list_pending(State(state): State<AppState>) -> Result<Json<Vec<PostResponse>>> {
    let filters = PostFilters {
        status: Some(PostStatus::Pending),
        ..Default::default()
    };

    let posts = PostService::new(state.db.clone())
        .list(&filters, SortOrder::OldestFirst, None)
        .await?;

    Ok(Json(to_responses(posts)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Approve,
    Deny,
}

impl DecisionAction {
    fn status(&self) -> PostStatus {
        match self {
            DecisionAction::Approve => PostStatus::Approved,
            DecisionAction::Deny => PostStatus::Denied,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkDecisionRequest {
    pub ids: Vec<i64>,
    pub action: DecisionAction,
    pub feedback: Option<String>,
}

async fn bulk_decide(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<BulkDecisionRequest>,
) -> Result<Json<BulkOutcome>> {
    if payload.ids.is_empty() {
        return Err(AppError::BadRequest("No post ids given".to_string()));
    }

    let outcome = moderation(&state)
        .bulk_decide(
            &current_user,
            &payload.ids,
            payload.action.status(),
            payload.feedback,
        )
        .await;

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct AdminPostQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AdminPostSummary {
    #[serde(flatten)]
    pub post: PostResponse,
    pub content_preview: String,
}

impl From<PostWithMedia> for AdminPostSummary {
    fn from(post: PostWithMedia) -> Self {
        let preview = content_preview(&post.post.content, PREVIEW_CHARS);
        Self {
            post: PostResponse::from(post),
            content_preview: preview,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminPostListResponse {
    pub posts: Vec<AdminPostSummary>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

async fn list_all_posts(
    State(state): State<AppState>,
    Query(query): Query<AdminPostQuery>,
) -> Result<Json<AdminPostListResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            PostStatus::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown status '{}'", raw)))?,
        ),
        None => None,
    };

    let filters = PostFilters {
        status,
        ..Default::default()
    };

    let service = PostService::new(state.db.clone());
    let total = service.count(&filters).await?;
    let posts = service
        .list(
            &filters,
            SortOrder::NewestFirst,
            Some(Page {
                limit: limit as i64,
                offset: ((page - 1) as i64) * (limit as i64),
            }),
        )
        .await?;

    Ok(Json(AdminPostListResponse {
        posts: posts.into_iter().map(AdminPostSummary::from).collect(),
        total,
        page,
        limit,
    }))
}

async fn approve_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    moderation(&state)
        .decide(&current_user, id, PostStatus::Approved, None)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Post {} has been approved", id),
    })))
}

#[derive(Debug, Deserialize)]
pub struct DenyRequest {
    pub feedback: Option<String>,
}

async fn deny_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    payload: Option<Json<DenyRequest>>,
) -> Result<Json<Value>> {
    let feedback = payload.and_then(|Json(body)| body.feedback);

    moderation(&state)
        .decide(&current_user, id, PostStatus::Denied, feedback)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Post {} has been denied", id),
    })))
}

#[derive(Debug, Deserialize)]
pub struct EditPostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Tag name; an empty string clears the tag
    pub tag: Option<String>,
}

async fn edit_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<EditPostRequest>,
) -> Result<Json<PostResponse>> {
    let title = payload.title.as_deref().map(validate_title).transpose()?;
    let content = payload.content.as_deref().map(validate_content).transpose()?;

    let tag_id = match payload.tag.as_deref().map(str::trim) {
        None => None,
        Some("") => Some(None),
        Some(name) => {
            let tag = TagService::new(state.db.clone())
                .find_by_name(name)
                .await?
                .ok_or_else(|| AppError::BadRequest(format!("Unknown tag '{}'", name)))?;
            Some(Some(tag.id))
        }
    };

    let post = moderation(&state)
        .edit(
            &current_user,
            id,
            UpdatePost {
                title,
                content,
                tag_id,
            },
        )
        .await?;

    Ok(Json(post.into()))
}

async fn delete_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    moderation(&state).delete(&current_user, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Post {} has been deleted", id),
    })))
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub action: String,
    pub admin_id: Option<i64>,
    pub admin_name: Option<String>,
    pub feedback: Option<String>,
    pub date_of_action: String,
}

impl From<ModerationLog> for HistoryEntry {
    fn from(log: ModerationLog) -> Self {
        Self {
            id: log.id,
            action: log.action,
            admin_id: log.admin_id,
            admin_name: log.admin_name,
            feedback: log.feedback,
            date_of_action: log.date_of_action.to_rfc3339(),
        }
    }
}

async fn post_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<HistoryEntry>>> {
    let logs = moderation(&state).history(id).await?;
    Ok(Json(logs.into_iter().map(HistoryEntry::from).collect()))
}
