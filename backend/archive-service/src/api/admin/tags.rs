use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::tags::TagResponse;
use crate::error::Result;
use crate::models::{CreateTag, UpdateTag};
use crate::services::TagService;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/:id", put(update_tag).delete(delete_tag))
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub display_order: Option<i32>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    pub display_order: Option<i32>,
    pub image_url: Option<String>,
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>> {
    let tags = TagService::new(state.db.clone()).list().await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

async fn create_tag(
    State(state): State<AppState>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagResponse>)> {
    let tag = TagService::new(state.db.clone())
        .create(CreateTag {
            name: payload.name,
            display_order: payload.display_order.unwrap_or(0),
            image_url: payload.image_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(tag.into())))
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTagRequest>,
) -> Result<Json<TagResponse>> {
    let tag = TagService::new(state.db.clone())
        .update(
            id,
            UpdateTag {
                name: payload.name,
                display_order: payload.display_order,
                image_url: payload.image_url,
            },
        )
        .await?;

    Ok(Json(tag.into()))
}

async fn delete_tag(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>> {
    TagService::new(state.db.clone()).delete(id).await?;
    Ok(Json(json!({ "success": true })))
}
