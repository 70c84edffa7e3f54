//! HTTP mapping of [`GoLoopError`]

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crate::utils::errors::{ErrorClass, GoLoopError, ImageHostError};

impl GoLoopError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GoLoopError::EventNotFound { .. }
            | GoLoopError::UserNotFound { .. }
            | GoLoopError::RegistrationNotFound { .. } => StatusCode::NOT_FOUND,
            GoLoopError::CapacityExceeded { .. }
            | GoLoopError::AlreadyDistributed { .. }
            | GoLoopError::RegistrationClosed { .. }
            | GoLoopError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            GoLoopError::Authentication(_) => StatusCode::UNAUTHORIZED,
            GoLoopError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            GoLoopError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            GoLoopError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GoLoopError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GoLoopError::ImageHost(ImageHostError::Rejected { .. } | ImageHostError::InvalidResponse(_)) => {
                StatusCode::BAD_GATEWAY
            }
            other if other.class() == ErrorClass::Transient => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GoLoopError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the log; the client gets a generic message
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, kind = self.kind(), severity = %self.severity(), "internal error");
            "internal server error".to_string()
        } else {
            if status.is_server_error() {
                tracing::warn!(error = %self, kind = self.kind(), "upstream failure");
            }
            self.to_string()
        };

        let body = serde_json::json!({
            "kind": self.kind(),
            "message": message,
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use uuid::Uuid;

    async fn body_json(error: GoLoopError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_precondition_statuses() {
        let event_id = Uuid::new_v4();
        assert_eq!(GoLoopError::CapacityExceeded { event_id }.status_code(), StatusCode::CONFLICT);
        assert_eq!(GoLoopError::AlreadyDistributed { event_id }.status_code(), StatusCode::CONFLICT);
        assert_eq!(GoLoopError::EventNotFound { event_id }.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            GoLoopError::UserNotFound { user_id: "u".to_string() }.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_caller_error_statuses() {
        assert_eq!(GoLoopError::Authentication("x".to_string()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(GoLoopError::PermissionDenied("x".to_string()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(GoLoopError::RateLimitExceeded.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(GoLoopError::InvalidInput("x".to_string()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(GoLoopError::PayloadTooLarge("x".to_string()).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_infrastructure_statuses() {
        assert_eq!(
            GoLoopError::Database(sqlx::Error::PoolTimedOut).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GoLoopError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GoLoopError::ImageHost(ImageHostError::Rejected { status: 400, message: "bad".to_string() }).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_json_body() {
        let event_id = Uuid::nil();
        let (status, json) = body_json(GoLoopError::CapacityExceeded { event_id }).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["kind"], "CAPACITY_EXCEEDED");
        assert_eq!(json["message"], format!("Event {} is at capacity", event_id));
    }

    #[tokio::test]
    async fn test_internal_message_is_hidden() {
        let (status, json) = body_json(GoLoopError::Config("secret leaked".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["kind"], "CONFIG");
        assert_eq!(json["message"], "internal server error");
    }
}
