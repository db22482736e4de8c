mod admin;
mod announcements;
mod auth;
mod contact;
mod posts;
mod tags;

use axum::{middleware, Router};

use crate::middleware::{require_admin, require_auth};
use crate::AppState;

/// All routes under `/api`
pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .merge(auth::public_routes())
        .merge(posts::public_routes())
        .merge(tags::routes())
        .merge(announcements::public_routes())
        .merge(contact::routes());

    let authenticated = Router::new()
        .merge(auth::protected_routes())
        .merge(posts::protected_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Layers run outermost-last: authentication happens before the role check.
    let admin = Router::new()
        .nest("/admin", admin::routes())
        .merge(announcements::admin_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(authenticated).merge(admin)
}
