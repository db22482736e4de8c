use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, Role};
use crate::models::UpsertUser;
use crate::services::{AuthService, GoogleOAuth, UserService};
use crate::utils::{mask_email, sanitize_return_path};
use crate::AppState;

const OAUTH_STATE_TTL: Duration = Duration::from_secs(600);

/// Routes reachable without a token
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/login/callback", get(callback))
        .route("/auth/logout", post(logout))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/user", get(current_user))
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response> {
    let oauth_state = GoogleOAuth::generate_state();
    let return_to = sanitize_return_path(query.return_to.as_deref());

    state
        .sessions
        .save_oauth_state(&oauth_state, &return_to, OAUTH_STATE_TTL)
        .await?;

    let url = state.oauth.authorization_url(&oauth_state)?;
    tracing::debug!(return_to = %return_to, "redirecting to Google sign-in");

    Ok(found(url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Authorization code not provided".to_string()))?;

    let oauth_state = query.state.unwrap_or_default();
    let return_to = state
        .sessions
        .take_oauth_state(&oauth_state)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired OAuth state".to_string()))?;

    let tokens = state.oauth.exchange_code(&code).await?;
    let info = state.oauth.fetch_userinfo(&tokens.access_token).await?;

    if info.is_unverified() {
        tracing::warn!(email = %mask_email(&info.email), "rejected unverified Google account");
        return Err(AppError::BadRequest(
            "User email not verified by Google".to_string(),
        ));
    }

    let role = if state.config.admin.is_admin_email(&info.email) {
        Role::Admin
    } else {
        Role::User
    };

    let profile = UpsertUser {
        google_id: info.sub.clone(),
        email: info.email.clone(),
        name: info.display_name(),
        profile_pic: info.picture.clone(),
    };
    let user = UserService::new(state.db.clone())
        .get_or_create_user(&profile, role)
        .await?;

    let token = AuthService::new(&state.config).issue_token(&user)?;

    let separator = if return_to.contains('?') { '&' } else { '?' };
    let location = format!(
        "{}{}{}token={}",
        state.config.frontend.origin.trim_end_matches('/'),
        return_to,
        separator,
        token
    );

    Ok(found(location))
}

async fn logout(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Json<Value> {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        let token = bearer.token();
        match AuthService::new(&state.config).decode_token(token) {
            Ok(claims) => {
                let ttl = AuthService::remaining_lifetime(&claims);
                if let Err(e) = state.sessions.revoke_token(token, ttl).await {
                    tracing::error!(error = %e, "failed to revoke token on logout");
                } else {
                    tracing::info!(user_id = %claims.sub, "user logged out");
                }
            }
            Err(_) => tracing::debug!("logout with invalid token; nothing to revoke"),
        }
    }

    Json(json!({ "success": true, "message": "Logged out" }))
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub profile_pic: Option<String>,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub authenticated: bool,
    pub user: UserInfo,
}

async fn current_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<CurrentUserResponse>> {
    let user = UserService::new(state.db.clone())
        .get(current_user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(CurrentUserResponse {
        authenticated: true,
        user: UserInfo {
            id: user.id,
            name: user.name,
            email: user.email,
            profile_pic: user.profile_pic,
            role: user.role,
        },
    }))
}
