//! Strava route pass-through endpoints.
//!
//! - GET /routes      routes of the authorized athlete
//! - GET /route/:id   a single route
//!
//! Both return Strava's JSON unchanged.

use axum::extract::{Path, State};
use axum::Json;

use crate::errors::{AppError, ErrorResponse};
use crate::services::tokens::TokenManager;

/// List the authorized athlete's routes.
#[utoipa::path(
    get,
    path = "/routes",
    tag = "Strava",
    responses(
        (status = 200, description = "Routes as returned by Strava"),
        (status = 500, description = "Not authorized or Strava request failed", body = ErrorResponse),
    )
)]
pub async fn list_routes(
    State(tokens): State<TokenManager>,
) -> Result<Json<serde_json::Value>, AppError> {
    let access_token = tokens
        .get_valid_access_token()
        .await
        .map_err(|e| AppError::RoutesFetchFailed(e.to_string()))?;

    let routes = tokens
        .strava()
        .list_routes(&access_token)
        .await
        .map_err(|e| AppError::RoutesFetchFailed(e.to_string()))?;

    Ok(Json(routes))
}

/// Get a single route by its Strava id.
#[utoipa::path(
    get,
    path = "/route/{id}",
    tag = "Strava",
    params(
        ("id" = String, Path, description = "Strava route id"),
    ),
    responses(
        (status = 200, description = "Route as returned by Strava"),
        (status = 400, description = "Malformed route id", body = ErrorResponse),
        (status = 500, description = "Not authorized or Strava request failed", body = ErrorResponse),
    )
)]
pub async fn get_route(
    State(tokens): State<TokenManager>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::BadRequest(format!("Invalid route id: {}", id)));
    }

    let access_token = tokens
        .get_valid_access_token()
        .await
        .map_err(|e| AppError::RouteFetchFailed(e.to_string()))?;

    let route = tokens
        .strava()
        .get_route(&access_token, &id)
        .await
        .map_err(|e| AppError::RouteFetchFailed(e.to_string()))?;

    Ok(Json(route))
}
