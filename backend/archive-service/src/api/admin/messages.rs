use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::models::Message;
use crate::services::MessageService;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_messages))
        .route("/messages/:id/resolve", post(resolve_message))
        .route("/messages/:id", delete(delete_message))
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub resolved: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub date_created: String,
    pub resolved: bool,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            message: m.message,
            date_created: m.date_created.to_rfc3339(),
            resolved: m.resolved,
        }
    }
}

async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Vec<MessageResponse>>> {
    let messages = MessageService::new(state.db.clone())
        .list(query.resolved)
        .await?;

    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

async fn resolve_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let message = MessageService::new(state.db.clone()).resolve(id).await?;
    Ok(Json(message.into()))
}

async fn delete_message(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>> {
    MessageService::new(state.db.clone()).delete(id).await?;
    Ok(Json(json!({ "success": true })))
}
