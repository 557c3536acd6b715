//! Liveness and readiness probes.

use crate::error::ApiError;
use crate::response::{Empty, ErrorBody};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// GET /pings: the process is up. Touches nothing else.
#[utoipa::path(get, path = "/pings", tag = "probe", responses((status = 200, description = "Alive", body = Empty)))]
pub async fn ping() -> Json<Empty> {
    Json(Empty {})
}

/// GET /ready: succeeds once the database answers `SELECT 1`.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "probe",
    responses(
        (status = 200, description = "Ready", body = Empty),
        (status = 503, description = "Database unreachable", body = ErrorBody),
    )
)]
pub async fn ready(State(state): State<AppState>) -> Result<Json<Empty>, ApiError> {
    if let Err(e) = sqlx::query("SELECT 1").execute(state.db.pool()).await {
        tracing::warn!(active_scopes = state.db.active_scopes(), "readiness check failed: {}", e);
        return Err(ApiError::transport(StatusCode::SERVICE_UNAVAILABLE));
    }
    Ok(Json(Empty {}))
}
