use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use crate::api::AppState;
use crate::services::ServiceHealthStatus;

/// Handle GET /healthz
pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<ServiceHealthStatus>) {
    let status = state.services.health_check().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}
