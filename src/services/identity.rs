//! Identity verification
//!
//! Bearer tokens are issued by the external identity provider and signed with
//! a shared HS256 secret. This module only verifies them.

use std::collections::HashSet;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::config::IdentityConfig;
use crate::utils::errors::{GoLoopError, Result};

/// Claims carried by an identity provider token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user id
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Clone)]
pub struct IdentityVerifier {
    key: DecodingKey,
    validation: Validation,
    bootstrap_admins: HashSet<String>,
}

impl IdentityVerifier {
    pub fn new(config: &IdentityConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            bootstrap_admins: config.bootstrap_admins.iter().cloned().collect(),
        }
    }

    /// Verify a bearer token and return the caller's identity
    pub fn verify(&self, token: &str) -> Result<Identity> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                ErrorKind::InvalidSignature => "invalid signature",
                ErrorKind::InvalidIssuer => "unexpected issuer",
                _ => "malformed token",
            };
            debug!(error = %e, "Token rejected");
            GoLoopError::Authentication(reason.to_string())
        })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(GoLoopError::Authentication("token has an empty subject".to_string()));
        }

        Ok(Identity {
            user_id: claims.sub,
            display_name: claims.name,
            email: claims.email,
            photo_url: claims.picture,
        })
    }

    /// Whether the user is granted the admin role on first sign-in
    pub fn is_bootstrap_admin(&self, user_id: &str) -> bool {
        self.bootstrap_admins.contains(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn config(issuer: Option<&str>) -> IdentityConfig {
        IdentityConfig {
            jwt_secret: SECRET.to_string(),
            issuer: issuer.map(str::to_string),
            bootstrap_admins: vec!["root".to_string()],
        }
    }

    fn token(sub: &str, exp_offset: i64, secret: &str, iss: Option<&str>) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            name: Some("Dewi".to_string()),
            email: Some("dewi@example.com".to_string()),
            picture: None,
            exp: (chrono::Utc::now().timestamp() + exp_offset) as u64,
            iss: iss.map(str::to_string),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_valid_token_yields_identity() {
        let verifier = IdentityVerifier::new(&config(None));
        let identity = verifier.verify(&token("user-1", 3600, SECRET, None)).unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.display_name.as_deref(), Some("Dewi"));
        assert_eq!(identity.email.as_deref(), Some("dewi@example.com"));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let verifier = IdentityVerifier::new(&config(None));
        let result = verifier.verify(&token("user-1", -3600, SECRET, None));
        assert!(matches!(result, Err(GoLoopError::Authentication(reason)) if reason == "token expired"));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let verifier = IdentityVerifier::new(&config(None));
        let result = verifier.verify(&token("user-1", 3600, "other-secret", None));
        assert!(matches!(result, Err(GoLoopError::Authentication(reason)) if reason == "invalid signature"));
    }

    #[test]
    fn test_issuer_is_enforced_when_configured() {
        let verifier = IdentityVerifier::new(&config(Some("https://id.goloop.test")));
        assert!(verifier.verify(&token("user-1", 3600, SECRET, Some("https://id.goloop.test"))).is_ok());
        assert!(verifier.verify(&token("user-1", 3600, SECRET, Some("https://evil.test"))).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let verifier = IdentityVerifier::new(&config(None));
        assert!(matches!(verifier.verify("not.a.jwt"), Err(GoLoopError::Authentication(_))));
    }

    #[test]
    fn test_bootstrap_admins() {
        let verifier = IdentityVerifier::new(&config(None));
        assert!(verifier.is_bootstrap_admin("root"));
        assert!(!verifier.is_bootstrap_admin("user-1"));
    }
}
