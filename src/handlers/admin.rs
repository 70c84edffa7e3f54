//! Admin handlers
//!
//! Every handler here resolves the caller through `require_admin` before
//! touching anything.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use crate::api::AppState;
use crate::middleware::AuthUser;
use crate::models::{Event, EventId};
use crate::services::{AdminBucket, DistributionReceipt, ModerationDecision};
use crate::utils::errors::Result;

#[derive(Debug, Deserialize)]
pub struct BucketQuery {
    #[serde(default = "default_bucket")]
    pub bucket: AdminBucket,
}

fn default_bucket() -> AdminBucket {
    AdminBucket::Pending
}

#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub decision: ModerationDecision,
}

/// Handle GET /admin/events?bucket=
pub async fn list_events(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<BucketQuery>,
) -> Result<Json<Vec<Event>>> {
    state.services.users.require_admin(&identity).await?;
    Ok(Json(state.services.events.admin_events(query.bucket).await?))
}

/// Handle POST /admin/events/{id}/moderation
pub async fn moderate_event(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    AuthUser(identity): AuthUser,
    Json(request): Json<ModerationRequest>,
) -> Result<Json<Event>> {
    let admin = state.services.users.require_admin(&identity).await?;
    let event = state.services.events.moderate(event_id, request.decision, &admin).await?;
    Ok(Json(event))
}

/// Handle GET /admin/completions - proofs waiting for review
pub async fn list_completions(State(state): State<AppState>, AuthUser(identity): AuthUser) -> Result<Json<Vec<Event>>> {
    state.services.users.require_admin(&identity).await?;
    Ok(Json(state.services.events.pending_completions().await?))
}

/// Handle POST /admin/events/{id}/completion/reject
pub async fn reject_proof(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Event>> {
    let admin = state.services.users.require_admin(&identity).await?;
    Ok(Json(state.services.events.reject_proof(event_id, &admin).await?))
}

/// Handle POST /events/{id}/points - approve the proof and pay out
pub async fn distribute_points(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    AuthUser(identity): AuthUser,
) -> Result<Json<DistributionReceipt>> {
    let admin = state.services.users.require_admin(&identity).await?;
    let receipt = state.services.points.distribute(event_id, &admin.uid).await?;
    Ok(Json(receipt))
}
