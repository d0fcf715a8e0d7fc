//! HTTP router and handlers.

use crate::app::AppState;
use axum::{
    Router, middleware,
    routing::{get, post},
};

pub mod applications;
pub mod auth;
pub mod channels;
pub mod error;
pub mod ingest;

/// Assemble the HTTP router with all routes.
///
/// Management routes sit behind the access policy; ingestion and health
/// stay reachable without credentials.
pub fn build_router(state: AppState) -> Router {
    let management = Router::new()
        .route(
            "/api/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route(
            "/api/applications/:app_id",
            get(applications::get_application)
                .post(channels::create_channel)
                .put(applications::update_application)
                .delete(applications::delete_application),
        )
        .route(
            "/api/applications/:app_id/channels/:channel_id",
            get(channels::get_channel)
                .put(channels::update_channel)
                .delete(channels::delete_channel),
        )
        .route(
            "/api/applications/:app_id/channels/:channel_id/live",
            get(channels::live),
        )
        .route(
            "/api/applications/:app_id/channels/:channel_id/window",
            get(channels::window),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_access,
        ));

    Router::new()
        .merge(management)
        .route("/api/log/:channel_id", post(ingest::ingest_log))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
