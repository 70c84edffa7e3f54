//! Bearer-token identity extraction
//!
//! Handlers take [`AuthUser`] when a caller must be signed in and
//! [`MaybeAuthUser`] when anonymous access is allowed. Role checks happen in
//! the services after extraction.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use crate::services::identity::{Identity, IdentityVerifier};
use crate::utils::errors::{GoLoopError, Result};

/// Signed-in caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

/// Caller that may be anonymous; a present but invalid token is still refused
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<Identity>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|identity| identity.user_id.as_str())
    }
}

/// Token from `Authorization: Bearer <token>`, `None` when the header is absent
fn bearer_token(parts: &Parts) -> Result<Option<String>> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| GoLoopError::Authentication("authorization header is not valid text".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| GoLoopError::Authentication("expected a bearer token".to_string()))?;

    Ok(Some(token.to_string()))
}

impl<S> FromRequestParts<S> for AuthUser
where
    IdentityVerifier: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GoLoopError;

    // Everything is resolved synchronously so the returned future borrows nothing
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = std::result::Result<Self, Self::Rejection>> + Send {
        let result = bearer_token(parts).and_then(|token| {
            let token = token.ok_or_else(|| GoLoopError::Authentication("sign-in required".to_string()))?;
            IdentityVerifier::from_ref(state).verify(&token)
        });

        async move { result.map(AuthUser) }
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    IdentityVerifier: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GoLoopError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = std::result::Result<Self, Self::Rejection>> + Send {
        let result = bearer_token(parts).and_then(|token| match token {
            Some(token) => IdentityVerifier::from_ref(state).verify(&token).map(Some),
            None => Ok(None),
        });

        async move { result.map(MaybeAuthUser) }
    }
}
