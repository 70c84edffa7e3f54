//! HTTP API
//!
//! Route table, shared state and the JSON error mapping.

pub mod error;
pub mod state;

pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use crate::handlers::{admin, events, health, stream, users};
use crate::middleware::trace_layer;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/locations", get(events::list_locations))
        .route("/events/{id}", get(events::get_event))
        .route("/events/{id}/status", get(events::event_status))
        .route("/events/{id}/status/stream", get(stream::status_stream))
        .route(
            "/events/{id}/registrations",
            get(events::list_registrations).post(events::register),
        )
        .route("/events/{id}/registrations/{user_id}", put(events::decide_registration))
        .route(
            "/events/{id}/completion-proof",
            post(events::submit_proof).layer(upload_limit),
        )
        .route("/events/{id}/points", post(admin::distribute_points))
        .route("/admin/events", get(admin::list_events))
        .route("/admin/events/{id}/moderation", post(admin::moderate_event))
        .route("/admin/events/{id}/completion/reject", post(admin::reject_proof))
        .route("/admin/completions", get(admin::list_completions))
        .route("/me", get(users::me).put(users::update_me))
        .route("/me/events", get(users::my_events))
        .route("/leaderboard", get(users::leaderboard))
        .route("/healthz", get(health::healthz))
        .layer(trace_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
