//! User service implementation
//!
//! This service handles sign-in upserts, profile management, role checks
//! and the points leaderboard.

use std::sync::Arc;
use tracing::{info, warn, debug};
use crate::database::EventStore;
use crate::models::user::{User, UserRole, CreateUserRequest, UpdateUserRequest};
use crate::services::identity::{Identity, IdentityVerifier};
use crate::services::redis::RedisService;
use crate::utils::errors::{GoLoopError, Result};

pub const LEADERBOARD_SIZE: i64 = 10;

/// User service for managing user operations
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn EventStore>,
    verifier: IdentityVerifier,
    redis: Option<Arc<RedisService>>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(store: Arc<dyn EventStore>, verifier: IdentityVerifier, redis: Option<Arc<RedisService>>) -> Self {
        Self { store, verifier, redis }
    }

    /// Return the caller's record, creating it on first sight
    pub async fn sign_in(&self, identity: &Identity) -> Result<User> {
        let role = if self.verifier.is_bootstrap_admin(&identity.user_id) {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let user = self
            .store
            .ensure_user(CreateUserRequest {
                uid: identity.user_id.clone(),
                display_name: identity.display_name.clone(),
                email: identity.email.clone(),
                photo_url: identity.photo_url.clone(),
                role,
            })
            .await?;

        debug!(user_id = %user.uid, role = ?user.role, "User signed in");
        Ok(user)
    }

    pub async fn get_user(&self, uid: &str) -> Result<User> {
        self.store
            .get_user(uid)
            .await?
            .ok_or_else(|| GoLoopError::UserNotFound { user_id: uid.to_string() })
    }

    /// Update display name and city
    pub async fn update_profile(&self, uid: &str, request: UpdateUserRequest) -> Result<User> {
        if let Some(name) = &request.display_name {
            if name.trim().is_empty() {
                return Err(GoLoopError::InvalidInput("Display name cannot be empty".to_string()));
            }
        }

        let user = self.store.update_user(uid, request).await?;
        info!(user_id = %uid, location = ?user.location, "User profile updated successfully");
        Ok(user)
    }

    /// Fail unless the signed-in caller holds the admin role
    pub async fn require_admin(&self, identity: &Identity) -> Result<User> {
        let user = self.sign_in(identity).await?;
        if !user.is_admin() {
            warn!(user_id = %user.uid, "Admin operation refused");
            return Err(GoLoopError::PermissionDenied("Admin role required".to_string()));
        }
        Ok(user)
    }

    /// Top users by points, served from cache when possible
    pub async fn leaderboard(&self) -> Result<Vec<User>> {
        if let Some(redis) = &self.redis {
            match redis.get_leaderboard().await {
                Ok(Some(users)) => return Ok(users),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Leaderboard cache unavailable"),
            }
        }

        let users = self.store.top_users(LEADERBOARD_SIZE).await?;

        if let Some(redis) = &self.redis {
            if let Err(e) = redis.cache_leaderboard(&users).await {
                warn!(error = %e, "Failed to cache leaderboard");
            }
        }

        Ok(users)
    }
}
