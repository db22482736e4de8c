use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, MaybeUser};
use crate::models::{Media, NewMedia, NewPost, PostStatus, PostWithMedia};
use crate::services::{
    parse_date_filter, parse_media_field, validate_content, validate_title, MediaField,
    MediaService, PostFilters, PostService, SortOrder, TagService,
};
use crate::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/tag/:tag", get(list_posts_by_tag))
        .route("/posts/:id", get(get_post))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/upload", post(upload_file))
        .route("/user/posts", get(list_own_posts))
        .route("/user/posts/:id", delete(delete_own_post))
}

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub id: i64,
    pub url: String,
    pub media_type: String,
    pub caption: Option<String>,
    pub filename: String,
}

impl From<Media> for MediaResponse {
    fn from(media: Media) -> Self {
        Self {
            id: media.id,
            url: media.url,
            media_type: media.media_type,
            caption: media.caption,
            filename: media.filename,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub tag: Option<String>,
    pub tag_id: Option<i64>,
    pub author: String,
    pub author_id: Option<i64>,
    pub profile_pic: Option<String>,
    pub date_created: String,
    pub date_updated: String,
    pub status: String,
    pub media: Vec<MediaResponse>,
}

impl From<PostWithMedia> for PostResponse {
    fn from(PostWithMedia { post, media }: PostWithMedia) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            tag: post.tag_name,
            tag_id: post.tag_id,
            author: post
                .author_name
                .unwrap_or_else(|| "Anonymous".to_string()),
            author_id: post.user_id,
            profile_pic: post.author_profile_pic,
            date_created: post.date_created.to_rfc3339(),
            date_updated: post.date_updated.to_rfc3339(),
            status: post.status,
            media: media.into_iter().map(MediaResponse::from).collect(),
        }
    }
}

pub fn to_responses(posts: Vec<PostWithMedia>) -> Vec<PostResponse> {
    posts.into_iter().map(PostResponse::from).collect()
}

#[derive(Debug, Deserialize)]
pub struct ArchiveQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub tag: Option<String>,
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ArchiveQuery>,
) -> Result<Json<Vec<PostResponse>>> {
    let filters = PostFilters {
        status: Some(PostStatus::Approved),
        title: query.title,
        author: query.author,
        date: parse_date_filter(query.date.as_deref())?,
        tag: query.tag,
        ..Default::default()
    };

    let posts = PostService::new(state.db.clone())
        .list(&filters, SortOrder::NewestFirst, None)
        .await?;

    Ok(Json(to_responses(posts)))
}

async fn list_posts_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<Vec<PostResponse>>> {
    let filters = PostFilters {
        status: Some(PostStatus::Approved),
        tag: Some(tag),
        ..Default::default()
    };

    let posts = PostService::new(state.db.clone())
        .list(&filters, SortOrder::NewestFirst, None)
        .await?;

    Ok(Json(to_responses(posts)))
}

async fn get_post(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>> {
    let post = PostService::new(state.db.clone()).require(id).await?;

    if post.post.status() != PostStatus::Approved {
        let allowed = viewer.is_some_and(|v| {
            v.role.can_moderate() || post.post.user_id == Some(v.id)
        });
        if !allowed {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }
    }

    Ok(Json(PostResponse::from(post)))
}

struct PendingFile {
    filename: String,
    bytes: Vec<u8>,
    index: u32,
}

#[derive(Debug, Serialize)]
pub struct CreatePostResponse {
    pub message: String,
    pub post: PostResponse,
}

async fn create_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreatePostResponse>)> {
    let max_media = state.config.uploads.max_media_per_post;

    let mut title = None;
    let mut content = None;
    let mut tag = None;
    let mut files: Vec<PendingFile> = Vec::new();
    let mut captions: HashMap<u32, String> = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = Some(field.text().await?),
            "content" => content = Some(field.text().await?),
            "tag" => tag = Some(field.text().await?),
            other => match parse_media_field(other) {
                Some(MediaField::File(index)) => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    if filename.trim().is_empty() {
                        continue;
                    }
                    if files.len() >= max_media {
                        tracing::warn!(
                            user_id = current_user.id,
                            filename = %filename,
                            "media limit reached; ignoring extra file"
                        );
                        continue;
                    }
                    let bytes = field.bytes().await?.to_vec();
                    files.push(PendingFile {
                        filename,
                        bytes,
                        index,
                    });
                }
                Some(MediaField::Caption(index)) => {
                    captions.insert(index, field.text().await?);
                }
                None => tracing::debug!(field = %other, "ignoring unknown form field"),
            },
        }
    }

    let title = validate_title(title.as_deref().unwrap_or_default())?;
    let content = validate_content(content.as_deref().unwrap_or_default())?;

    let tag_id = match tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(name) => match TagService::new(state.db.clone()).find_by_name(name).await? {
            Some(tag) => Some(tag.id),
            None => {
                tracing::warn!(tag = %name, "unknown tag on submission; storing post untagged");
                None
            }
        },
        None => None,
    };

    let media_service = MediaService::new(state.media.clone(), &state.config.uploads);
    let mut stored: Vec<NewMedia> = Vec::with_capacity(files.len());
    for file in files {
        let caption = captions.remove(&file.index);
        match media_service.store(&file.filename, file.bytes, caption).await {
            Ok(media) => stored.push(media),
            Err(e) => {
                media_service.discard(&storage_keys(&stored)).await;
                return Err(e);
            }
        }
    }

    let keys = storage_keys(&stored);
    let created = PostService::new(state.db.clone())
        .create(NewPost {
            title,
            content,
            tag_id,
            user_id: current_user.id,
            media: stored,
        })
        .await;

    let post = match created {
        Ok(post) => post,
        Err(e) => {
            media_service.discard(&keys).await;
            return Err(e);
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "Post added successfully".to_string(),
            post: PostResponse::from(post),
        }),
    ))
}

fn storage_keys(media: &[NewMedia]) -> Vec<String> {
    media.iter().map(|m| m.storage_key.clone()).collect()
}

async fn upload_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.trim().is_empty() {
            return Err(AppError::BadRequest("No file selected".to_string()));
        }
        let bytes = field.bytes().await?.to_vec();
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let media = MediaService::new(state.media.clone(), &state.config.uploads)
        .store(&filename, bytes, None)
        .await?;

    tracing::info!(user_id = current_user.id, key = %media.storage_key, "standalone upload");

    let mut body = Map::new();
    body.insert("url".to_string(), json!(media.url));
    body.insert("media_type".to_string(), json!(media.media_type.as_str()));
    body.insert(
        format!("{}_url", media.media_type.as_str()),
        json!(media.url),
    );

    Ok(Json(Value::Object(body)))
}

async fn list_own_posts(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<PostResponse>>> {
    let filters = PostFilters {
        user_id: Some(current_user.id),
        ..Default::default()
    };

    let posts = PostService::new(state.db.clone())
        .list(&filters, SortOrder::NewestFirst, None)
        .await?;

    Ok(Json(to_responses(posts)))
}

async fn delete_own_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let posts = PostService::new(state.db.clone());
    let post = posts.require(id).await?;

    if post.post.user_id != Some(current_user.id) {
        return Err(AppError::Forbidden);
    }

    let keys = posts.delete(id).await?;
    MediaService::new(state.media.clone(), &state.config.uploads)
        .discard(&keys)
        .await;

    tracing::info!(post_id = id, user_id = current_user.id, "author deleted post");

    Ok(Json(json!({ "success": true, "message": "Post deleted" })))
}
