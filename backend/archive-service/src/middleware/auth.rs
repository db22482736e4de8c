use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::services::{AuthService, UserService};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub name: String,
    pub role: Role,
    pub profile_pic: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn can_moderate(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Validates a bearer token and resolves it to the caller's identity
pub async fn authenticate(state: &AppState, token: &str) -> Result<CurrentUser> {
    let claims = AuthService::new(&state.config).decode_token(token)?;

    if state.sessions.is_revoked(token).await? {
        return Err(AppError::Unauthorized);
    }

    let id = claims.sub.parse::<i64>().map_err(|_| AppError::Unauthorized)?;

    Ok(CurrentUser {
        id,
        email: claims.email,
        name: claims.name,
        role: claims.role,
    })
}

pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::Unauthorized)?;
    let current_user = authenticate(&state, bearer.token()).await?;

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

/// Must run after `require_auth`.
///
/// The token's role only short-circuits refusals. Admin tokens are
/// re-checked against the user row so demotions and deletions apply
/// before the token expires.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let current_user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::Unauthorized)?;

    if !current_user.role.can_moderate() {
        return Err(AppError::Forbidden);
    }

    let user = UserService::new(state.db.clone())
        .get(current_user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let role = user.role();
    if !role.can_moderate() {
        tracing::warn!(user_id = user.id, "admin token used after demotion");
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        email: user.email,
        name: user.name,
        role,
    });

    Ok(next.run(request).await)
}

/// Caller identity on public routes; anonymous when the token is absent or bad
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Ok(TypedHeader(Authorization(bearer))) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
        else {
            return Ok(MaybeUser(None));
        };

        Ok(MaybeUser(authenticate(state, bearer.token()).await.ok()))
    }
}
