//! Event handlers

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::debug;
use crate::api::AppState;
use crate::middleware::{AuthUser, MaybeAuthUser};
use crate::models::{City, CreateEventRequest, Event, EventId, RegisterParticipantRequest, Registration, RegistrationOutcome, RegistrationStatus};
use crate::services::ImageUpload;
use crate::status::EventView;
use crate::utils::errors::{GoLoopError, Result};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationDecision {
    pub status: RegistrationStatus,
}

/// Handle GET /events - approved events, optionally in one city
pub async fn list_events(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Result<Json<Vec<Event>>> {
    let location = match query.location.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) => Some(name.parse::<City>().map_err(GoLoopError::InvalidInput)?),
    };

    let events = state.services.events.list_approved(location).await?;
    Ok(Json(events))
}

/// Handle GET /events/locations
pub async fn list_locations(State(state): State<AppState>) -> Result<Json<Vec<City>>> {
    Ok(Json(state.services.events.locations().await?))
}

pub async fn get_event(State(state): State<AppState>, Path(event_id): Path<EventId>) -> Result<Json<Event>> {
    Ok(Json(state.services.events.get_event(event_id).await?))
}

/// Handle POST /events - submit an event for moderation
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>)> {
    let creator = state.services.users.sign_in(&identity).await?;
    let event = state.services.events.create_event(&creator, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Handle GET /events/{id}/status
///
/// An unknown event is reported in the body as `not_found` rather than as an
/// HTTP error, so the stream and the snapshot share one shape.
pub async fn event_status(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    viewer: MaybeAuthUser,
) -> Result<Json<EventView>> {
    let view = state.services.events.status_view(event_id, viewer.user_id()).await?;
    Ok(Json(view))
}

/// Handle POST /events/{id}/registrations
///
/// Answers 201 when a slot was taken and 200 when the caller was already
/// registered.
pub async fn register(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    AuthUser(identity): AuthUser,
) -> Result<(StatusCode, Json<RegistrationOutcome>)> {
    let user = state.services.users.sign_in(&identity).await?;

    let outcome = state
        .services
        .registration
        .register(RegisterParticipantRequest {
            event_id,
            user_id: user.uid,
            display_name: user.display_name,
            photo_url: user.photo_url,
        })
        .await?;

    let status = if outcome.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(outcome)))
}

/// Handle GET /events/{id}/registrations - organizer or admin only
pub async fn list_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Registration>>> {
    let caller = state.services.users.sign_in(&identity).await?;
    Ok(Json(state.services.events.registrations(event_id, &caller).await?))
}

/// Handle PUT /events/{id}/registrations/{user_id}
pub async fn decide_registration(
    State(state): State<AppState>,
    Path((event_id, user_id)): Path<(EventId, String)>,
    AuthUser(identity): AuthUser,
    Json(decision): Json<RegistrationDecision>,
) -> Result<Json<Registration>> {
    let caller = state.services.users.sign_in(&identity).await?;
    let registration = state
        .services
        .events
        .decide_registration(event_id, &user_id, decision.status, &caller)
        .await?;
    Ok(Json(registration))
}

/// Handle POST /events/{id}/completion-proof - multipart field `file`
pub async fn submit_proof(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    AuthUser(identity): AuthUser,
    multipart: Multipart,
) -> Result<Json<Event>> {
    let organizer = state.services.users.sign_in(&identity).await?;
    let image = read_image(multipart).await?;
    debug!(event_id = %event_id, file_name = %image.file_name, "Completion proof received");

    let event = state.services.events.submit_proof(event_id, &organizer, image).await?;
    Ok(Json(event))
}

async fn read_image(mut multipart: Multipart) -> Result<ImageUpload> {
    let invalid = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GoLoopError::PayloadTooLarge(e.body_text())
        } else {
            GoLoopError::InvalidInput(format!("Malformed upload: {}", e))
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("proof").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(invalid)?;

        return Ok(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(GoLoopError::InvalidInput("Missing file field".to_string()))
}
