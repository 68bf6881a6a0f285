use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::tokens::TokenManager;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status (always "ok" when the process answers)
    pub status: String,
    /// API version
    pub version: String,
    /// Whether a Strava credential is loaded (it may still need a refresh)
    pub authorized: bool,
}

/// Health check endpoint.
///
/// Reports the API version and whether Strava has been authorized, so the
/// frontend can decide whether to start the OAuth flow.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(tokens): State<TokenManager>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        authorized: tokens.is_authorized().await,
    })
}
