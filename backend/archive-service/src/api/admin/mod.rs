mod messages;
mod posts;
mod tags;
mod users;

use axum::{routing::get, Router};

use super::announcements;
use crate::AppState;

/// Everything under `/api/admin`; the caller applies the auth and admin guards
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(posts::routes())
        .merge(tags::routes())
        .merge(users::routes())
        .merge(messages::routes())
        .route("/announcements", get(announcements::list_all))
}
