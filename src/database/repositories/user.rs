//! User repository implementation

use sqlx::{PgExecutor, PgPool};
use chrono::Utc;
use crate::models::user::{User, CreateUserRequest, UpdateUserRequest};
use crate::utils::errors::GoLoopError;

#[derive(Clone)]
#[derive(Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the user unless a record already exists, returning the stored row
    pub async fn create_if_absent(&self, request: CreateUserRequest) -> Result<User, GoLoopError> {
        let uid = request.uid.clone();
        let now = Utc::now();

        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (uid, display_name, email, photo_url, role, points, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $6)
            ON CONFLICT (uid) DO NOTHING
            RETURNING uid, display_name, email, photo_url, location, role, points, created_at, updated_at
            "#
        )
        .bind(request.uid)
        .bind(request.display_name)
        .bind(request.email)
        .bind(request.photo_url)
        .bind(request.role)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(user) => Ok(user),
            None => self
                .find_by_uid(&uid)
                .await?
                .ok_or(GoLoopError::UserNotFound { user_id: uid }),
        }
    }

    /// Find user by uid
    pub async fn find_by_uid(&self, uid: &str) -> Result<Option<User>, GoLoopError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT uid, display_name, email, photo_url, location, role, points, created_at, updated_at FROM users WHERE uid = $1"
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Update user profile
    pub async fn update(&self, uid: &str, request: UpdateUserRequest) -> Result<Option<User>, GoLoopError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET display_name = COALESCE($2, display_name),
                location = COALESCE($3, location),
                updated_at = $4
            WHERE uid = $1
            RETURNING uid, display_name, email, photo_url, location, role, points, created_at, updated_at
            "#
        )
        .bind(uid)
        .bind(request.display_name)
        .bind(request.location)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Users with the most points
    pub async fn top_by_points(&self, limit: i64) -> Result<Vec<User>, GoLoopError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT uid, display_name, email, photo_url, location, role, points, created_at, updated_at FROM users ORDER BY points DESC, uid ASC LIMIT $1"
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Relative increment; returns the number of rows touched
    pub async fn add_points<'e, E: PgExecutor<'e>>(executor: E, uid: &str, delta: i64) -> Result<u64, GoLoopError> {
        let result = sqlx::query("UPDATE users SET points = points + $2, updated_at = $3 WHERE uid = $1")
            .bind(uid)
            .bind(delta)
            .bind(Utc::now())
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
