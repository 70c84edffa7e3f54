//! Event repository implementation
//!
//! Pool-level reads go through [`EventRepository`]; the associated functions
//! taking an executor are used inside store transactions.

use sqlx::{PgExecutor, PgPool};
use chrono::Utc;
use crate::models::event::{Event, EventFilter, EventId, NewEvent};
use crate::utils::errors::GoLoopError;

const EVENT_COLUMNS: &str = "id, title, organizer, location, location_detail, description, image_url, date_time, \
    capacity, registered, status, completion_status, completion_proof_image_url, points_distributed, \
    organizer_points, participant_points, creator_id, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event awaiting moderation
    pub async fn create(&self, event: NewEvent) -> Result<Event, GoLoopError> {
        let request = event.request;
        let sql = format!(
            r#"
            INSERT INTO events (title, organizer, location, location_detail, description, image_url, date_time,
                                capacity, organizer_points, participant_points, creator_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {EVENT_COLUMNS}
            "#
        );

        let event = sqlx::query_as::<_, Event>(&sql)
            .bind(request.title)
            .bind(request.organizer)
            .bind(request.location)
            .bind(request.location_detail)
            .bind(request.description)
            .bind(request.image_url)
            .bind(request.date_time)
            .bind(request.capacity)
            .bind(event.organizer_points)
            .bind(event.participant_points)
            .bind(event.creator_id)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, GoLoopError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let event = sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// List events matching a filter, newest first
    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, GoLoopError> {
        let base = format!("SELECT {EVENT_COLUMNS} FROM events");
        let order = "ORDER BY date_time DESC";

        let events = match filter {
            EventFilter::Approved { location } => {
                let sql = format!("{base} WHERE status = 'approved' AND ($1::city IS NULL OR location = $1) {order}");
                sqlx::query_as::<_, Event>(&sql)
                    .bind(*location)
                    .fetch_all(&self.pool)
                    .await?
            }
            EventFilter::Pending => {
                let sql = format!("{base} WHERE status = 'pending' {order}");
                sqlx::query_as::<_, Event>(&sql).fetch_all(&self.pool).await?
            }
            EventFilter::UpcomingApproved { now } => {
                let sql = format!("{base} WHERE status = 'approved' AND date_time > $1 {order}");
                sqlx::query_as::<_, Event>(&sql).bind(*now).fetch_all(&self.pool).await?
            }
            EventFilter::PastApproved { now } => {
                let sql = format!("{base} WHERE status = 'approved' AND date_time <= $1 {order}");
                sqlx::query_as::<_, Event>(&sql).bind(*now).fetch_all(&self.pool).await?
            }
            EventFilter::Rejected => {
                let sql = format!("{base} WHERE status = 'rejected' {order}");
                sqlx::query_as::<_, Event>(&sql).fetch_all(&self.pool).await?
            }
            EventFilter::ProofSubmitted => {
                let sql = format!("{base} WHERE completion_status = 'proof_submitted' {order}");
                sqlx::query_as::<_, Event>(&sql).fetch_all(&self.pool).await?
            }
            EventFilter::CreatedBy { user_id } => {
                let sql = format!("{base} WHERE creator_id = $1 {order}");
                sqlx::query_as::<_, Event>(&sql).bind(user_id).fetch_all(&self.pool).await?
            }
        };

        Ok(events)
    }

    /// Read an event and hold its row lock until the transaction ends
    pub async fn lock<'e, E: PgExecutor<'e>>(executor: E, id: EventId) -> Result<Option<Event>, GoLoopError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
        let event = sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(event)
    }

    /// Persist the moderation and completion workflow fields
    pub async fn update_workflow<'e, E: PgExecutor<'e>>(executor: E, event: &Event) -> Result<Event, GoLoopError> {
        let sql = format!(
            r#"
            UPDATE events
            SET status = $2,
                completion_status = $3,
                completion_proof_image_url = $4,
                updated_at = $5
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        );

        let event = sqlx::query_as::<_, Event>(&sql)
            .bind(event.id)
            .bind(event.status)
            .bind(event.completion_status)
            .bind(&event.completion_proof_image_url)
            .bind(Utc::now())
            .fetch_one(executor)
            .await?;

        Ok(event)
    }

    /// Take one slot; the table's CHECK constraint refuses going over capacity
    pub async fn increment_registered<'e, E: PgExecutor<'e>>(executor: E, id: EventId) -> Result<(), GoLoopError> {
        sqlx::query("UPDATE events SET registered = registered + 1, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Close the completion workflow and set the payout guard
    pub async fn mark_completed<'e, E: PgExecutor<'e>>(executor: E, id: EventId) -> Result<Event, GoLoopError> {
        let sql = format!(
            r#"
            UPDATE events
            SET completion_status = 'completed',
                points_distributed = TRUE,
                updated_at = $2
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        );

        let event = sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(Utc::now())
            .fetch_one(executor)
            .await?;

        Ok(event)
    }
}
