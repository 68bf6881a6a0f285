use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// Any forecast request of a pipeline run failed; the whole run is discarded.
    #[error("Forecast fetch failed: {0}")]
    ForecastFetchFailed(String),

    #[error("Route list fetch failed: {0}")]
    RoutesFetchFailed(String),

    #[error("Route detail fetch failed: {0}")]
    RouteFetchFailed(String),

    #[error("Strava authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ExternalServiceError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            // Public message stays generic; the cause is only logged.
            AppError::ForecastFetchFailed(cause) => {
                tracing::error!("Wind forecast failed: {}", cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch wind forecast.".to_string(),
                )
            }
            AppError::RoutesFetchFailed(cause) => {
                tracing::error!("Route list failed: {}", cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch routes.".to_string(),
                )
            }
            AppError::RouteFetchFailed(cause) => {
                tracing::error!("Route detail failed: {}", cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch route details.".to_string(),
                )
            }
            AppError::AuthenticationFailed(cause) => {
                tracing::error!("Strava authentication failed: {}", cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Strava authentication failed.".to_string(),
                )
            }
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}
