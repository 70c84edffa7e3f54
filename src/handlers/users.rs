//! User handlers

use axum::extract::State;
use axum::Json;
use crate::api::AppState;
use crate::middleware::AuthUser;
use crate::models::{UpdateUserRequest, User};
use crate::services::MyEvents;
use crate::utils::errors::Result;

/// Handle GET /me - creates the record on first sign-in
pub async fn me(State(state): State<AppState>, AuthUser(identity): AuthUser) -> Result<Json<User>> {
    Ok(Json(state.services.users.sign_in(&identity).await?))
}

/// Handle PUT /me
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    let user = state.services.users.sign_in(&identity).await?;
    Ok(Json(state.services.users.update_profile(&user.uid, request).await?))
}

/// Handle GET /me/events - created and joined events
pub async fn my_events(State(state): State<AppState>, AuthUser(identity): AuthUser) -> Result<Json<MyEvents>> {
    Ok(Json(state.services.events.my_events(&identity.user_id).await?))
}

pub async fn leaderboard(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.services.users.leaderboard().await?))
}
