use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::services::MessageService;
use crate::utils::mask_email;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/about/contact", post(submit_contact))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

async fn submit_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    payload.validate()?;

    let name = payload.name.trim();
    let message = payload.message.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if message.is_empty() {
        return Err(AppError::BadRequest("Message is required".to_string()));
    }
    let email = payload.email.trim();

    let stored = MessageService::new(state.db.clone())
        .create(name, email, message)
        .await?;

    if let Err(e) = state.email.send_contact_email(name, email, message).await {
        tracing::error!(message_id = stored.id, error = %e, "failed to forward contact message");
    }

    tracing::info!(message_id = stored.id, from = %mask_email(email), "contact message received");

    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}
