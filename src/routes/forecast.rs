//! Wind forecast HTTP endpoint.
//!
//! - POST /forecast  body: { coordinates: [[lat, lon], ...], timeISO }

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::services::forecast::{build_forecast_series, Coordinate, ForecastPoint};
use crate::services::tomorrow::TomorrowClient;

/// Shared state for the forecast endpoint.
#[derive(Clone)]
pub(crate) struct ForecastState {
    pub(crate) tomorrow: TomorrowClient,
    /// Pause between consecutive forecast requests of one route
    pub(crate) throttle: Duration,
}

/// Route to analyse and the time of travel.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ForecastRequest {
    /// Route points in travel order, each `[lat, lon]`
    #[schema(value_type = Vec<Vec<f64>>, example = json!([[47.37, 8.54], [47.38, 8.56]]))]
    pub coordinates: Vec<Coordinate>,
    /// Target time in ISO 8601 format (e.g. "2024-06-01T08:00:00Z").
    /// Values without an offset are taken as UTC.
    #[serde(rename = "timeISO")]
    pub time_iso: String,
}

/// Get the wind forecast and its headwind/tailwind impact along a route.
///
/// Fetches one hourly forecast per coordinate, sequentially and throttled.
/// Points with no forecast sample at or after `timeISO` are omitted. If any
/// forecast request fails the whole call fails.
#[utoipa::path(
    post,
    path = "/forecast",
    tag = "Forecast",
    request_body = ForecastRequest,
    responses(
        (status = 200, description = "Per-point wind forecast in route order", body = Vec<ForecastPoint>),
        (status = 400, description = "Malformed body or invalid timeISO", body = ErrorResponse),
        (status = 500, description = "A forecast request failed", body = ErrorResponse),
    )
)]
pub async fn post_forecast(
    State(state): State<ForecastState>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<Vec<ForecastPoint>>, AppError> {
    let Json(request) =
        payload.map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    let target_time = parse_target_time(&request.time_iso).ok_or_else(|| {
        AppError::BadRequest(format!("Invalid timeISO: {}", request.time_iso))
    })?;

    tracing::info!(
        "Wind forecast for {} points at {}",
        request.coordinates.len(),
        target_time
    );

    let points = build_forecast_series(
        &state.tomorrow,
        &request.coordinates,
        target_time,
        state.throttle,
    )
    .await?;

    Ok(Json(points))
}

/// Parse an ISO 8601 timestamp. RFC 3339 (with `Z` or an offset) is tried
/// first, then local date-times without offset, which are read as UTC.
fn parse_target_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Some(dt);
    }

    // "2024-01-01T08:00:00", "2024-01-01T08:00:00.000", "2024-01-01T08:00", "2024-01-01T08:00Z"
    let naive = s.strip_suffix('Z').unwrap_or(s);
    let formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}
