use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::Result;
use crate::models::Tag;
use crate::services::TagService;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/tags", get(list_tags))
}

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub display_order: i32,
    pub image_url: Option<String>,
    pub date_created: String,
    pub date_updated: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            display_order: tag.display_order,
            image_url: tag.image_url,
            date_created: tag.date_created.to_rfc3339(),
            date_updated: tag.date_updated.to_rfc3339(),
        }
    }
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>> {
    let tags = TagService::new(state.db.clone()).list().await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}
