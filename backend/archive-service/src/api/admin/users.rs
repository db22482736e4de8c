use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, Role};
use crate::models::User;
use crate::services::UserService;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", patch(update_user_role))
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub profile_pic: Option<String>,
    pub role: String,
    pub date_created: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            profile_pic: user.profile_pic,
            role: user.role,
            date_created: user.date_created.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>> {
    let users = UserService::new(state.db.clone()).list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn update_user_role(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<UserResponse>> {
    let role = Role::parse(&payload.role)
        .ok_or_else(|| AppError::BadRequest("Role must be 'user' or 'admin'".to_string()))?;

    if id == current_user.id && role != Role::Admin {
        return Err(AppError::BadRequest(
            "Admins cannot remove their own admin role".to_string(),
        ));
    }

    let user = UserService::new(state.db.clone())
        .update_role(id, role)
        .await?;

    tracing::info!(admin_id = current_user.id, user_id = id, role = role.as_str(), "role changed by admin");

    Ok(Json(user.into()))
}
