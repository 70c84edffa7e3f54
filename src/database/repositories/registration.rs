//! Registration repository implementation

use sqlx::{PgExecutor, PgPool};
use crate::models::event::EventId;
use crate::models::registration::{JoinedEvent, Registration, RegistrationStatus};
use crate::utils::errors::GoLoopError;

#[derive(Clone, Debug)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the registration of one user for one event
    pub async fn find<'e, E: PgExecutor<'e>>(executor: E, event_id: EventId, user_id: &str) -> Result<Option<Registration>, GoLoopError> {
        let registration = sqlx::query_as::<_, Registration>(
            "SELECT event_id, user_id, display_name, photo_url, status, registered_at FROM registrations WHERE event_id = $1 AND user_id = $2"
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(registration)
    }

    pub async fn get(&self, event_id: EventId, user_id: &str) -> Result<Option<Registration>, GoLoopError> {
        Self::find(&self.pool, event_id, user_id).await
    }

    /// Insert a new registration; the primary key refuses a second row per user
    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, registration: &Registration) -> Result<Registration, GoLoopError> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO registrations (event_id, user_id, display_name, photo_url, status, registered_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING event_id, user_id, display_name, photo_url, status, registered_at
            "#
        )
        .bind(registration.event_id)
        .bind(&registration.user_id)
        .bind(&registration.display_name)
        .bind(&registration.photo_url)
        .bind(registration.status)
        .bind(registration.registered_at)
        .fetch_one(executor)
        .await?;

        Ok(registration)
    }

    /// Get event registrations, oldest first
    pub async fn list_for_event(&self, event_id: EventId) -> Result<Vec<Registration>, GoLoopError> {
        let registrations = sqlx::query_as::<_, Registration>(
            "SELECT event_id, user_id, display_name, photo_url, status, registered_at FROM registrations WHERE event_id = $1 ORDER BY registered_at ASC"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    /// Read an event's registrations and block status changes until the transaction ends
    pub async fn lock_for_event<'e, E: PgExecutor<'e>>(executor: E, event_id: EventId) -> Result<Vec<Registration>, GoLoopError> {
        let registrations = sqlx::query_as::<_, Registration>(
            "SELECT event_id, user_id, display_name, photo_url, status, registered_at FROM registrations WHERE event_id = $1 ORDER BY user_id FOR SHARE"
        )
        .bind(event_id)
        .fetch_all(executor)
        .await?;

        Ok(registrations)
    }

    /// Update registrant status
    pub async fn update_status(&self, event_id: EventId, user_id: &str, status: RegistrationStatus) -> Result<Option<Registration>, GoLoopError> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            UPDATE registrations
            SET status = $3
            WHERE event_id = $1 AND user_id = $2
            RETURNING event_id, user_id, display_name, photo_url, status, registered_at
            "#
        )
        .bind(event_id)
        .bind(user_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Events a user registered for, with that user's status
    pub async fn joined_by_user(&self, user_id: &str) -> Result<Vec<JoinedEvent>, GoLoopError> {
        let joined = sqlx::query_as::<_, JoinedEvent>(
            r#"
            SELECT e.id, e.title, e.organizer, e.location, e.location_detail, e.description, e.image_url, e.date_time,
                   e.capacity, e.registered, e.status, e.completion_status, e.completion_proof_image_url,
                   e.points_distributed, e.organizer_points, e.participant_points, e.creator_id,
                   e.created_at, e.updated_at, r.status AS registration_status
            FROM registrations r
            JOIN events e ON e.id = r.event_id
            WHERE r.user_id = $1
            ORDER BY e.date_time DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(joined)
    }
}
