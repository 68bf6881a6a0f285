//! Throttled wind forecast pipeline.
//!
//! Walks a route in order and, for every coordinate, fetches the hourly
//! forecast, picks the sample at the target time, and scores the wind
//! against the bearing to the next coordinate.
//!
//! Requests are strictly sequential with a fixed pause between them to stay
//! under the provider's rate limit. The run is all-or-error: a single failed
//! request fails the whole series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::geometry::bearing;
use crate::services::tomorrow::{select_sample, TomorrowClient, WindSample};
use crate::services::wind::wind_impact;

/// A route point, serialized as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinate(pub f64, pub f64);

impl Coordinate {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }
}

/// Wind forecast and its effect on travel at one route point.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub lat: f64,
    pub lon: f64,
    /// Forecast wind speed, in the provider's units
    pub wind_speed: f64,
    /// Direction the wind blows from (degrees, 0 = north)
    pub wind_direction: f64,
    /// Bearing towards the next route point; 0 for the last point
    pub bearing: f64,
    /// Wind speed projected on the travel bearing, in `[-windSpeed, windSpeed]`
    pub impact: f64,
}

/// Build the forecast series for `coordinates` at `target_time`.
///
/// Output preserves input order. Coordinates whose forecast has no sample at
/// or after `target_time` are dropped. `throttle` is awaited between
/// consecutive requests, never after the last one.
pub async fn build_forecast_series(
    client: &TomorrowClient,
    coordinates: &[Coordinate],
    target_time: DateTime<Utc>,
    throttle: Duration,
) -> Result<Vec<ForecastPoint>, AppError> {
    let mut points = Vec::with_capacity(coordinates.len());

    for (i, coord) in coordinates.iter().enumerate() {
        if i > 0 && !throttle.is_zero() {
            tokio::time::sleep(throttle).await;
        }

        let series = client
            .fetch_hourly(coord.lat(), coord.lon())
            .await
            .map_err(|e| {
                AppError::ForecastFetchFailed(format!(
                    "point {} ({}, {}): {}",
                    i,
                    coord.lat(),
                    coord.lon(),
                    e
                ))
            })?;

        let Some(sample) = select_sample(&series, target_time) else {
            tracing::debug!(
                "No forecast sample at or after {} for ({}, {}), skipping",
                target_time,
                coord.lat(),
                coord.lon()
            );
            continue;
        };

        let wind = WindSample::from(&sample.values);
        let bearing_deg = match coordinates.get(i + 1) {
            Some(next) => bearing(coord.lat(), coord.lon(), next.lat(), next.lon()),
            None => 0.0,
        };
        let impact = wind_impact(bearing_deg, wind.direction_deg, wind.speed);

        tracing::debug!(
            "Point {}: wind {} from {}°, bearing {:.1}°, impact {:.2}",
            i,
            wind.speed,
            wind.direction_deg,
            bearing_deg,
            impact
        );

        points.push(ForecastPoint {
            lat: coord.lat(),
            lon: coord.lon(),
            wind_speed: wind.speed,
            wind_direction: wind.direction_deg,
            bearing: bearing_deg,
            impact,
        });
    }

    Ok(points)
}
