//! Community archive backend.
//!
//! Visitors browse approved posts grouped by tag, signed-in contributors
//! submit stories with media, and admins moderate submissions, tags,
//! users, announcements and contact messages.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use media_store::MediaStore;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::Database;
use crate::services::{EmailService, GoogleOAuth, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub sessions: Arc<dyn SessionStore>,
    pub media: Arc<dyn MediaStore>,
    pub email: EmailService,
    pub oauth: GoogleOAuth,
}

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let origin = state
        .config
        .frontend
        .origin
        .trim_end_matches('/')
        .parse::<HeaderValue>()?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    let body_limit = state.config.uploads.body_limit();

    Ok(Router::new()
        .route("/health", get(health_check))
        .nest("/api", api::routes(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn health_check() -> &'static str {
    "OK"
}
