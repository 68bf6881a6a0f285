//! tomorrow.io Weather Forecast API client.
//!
//! Fetches hourly forecasts for a single location and selects the sample
//! matching a target time.
//! See: https://docs.tomorrow.io/reference/weather-forecast

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::errors::AppError;

const FORECAST_PATH: &str = "/v4/weather/forecast";

/// Client for the tomorrow.io forecast endpoint.
#[derive(Debug, Clone)]
pub struct TomorrowClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

// --- tomorrow.io JSON response types ---

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    timelines: Timelines,
}

#[derive(Debug, Default, Deserialize)]
struct Timelines {
    #[serde(default)]
    hourly: Vec<HourlySample>,
}

/// One entry of the hourly timeline.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlySample {
    /// ISO 8601 timestamp of the sample
    pub time: String,
    #[serde(default)]
    pub values: SampleValues,
}

/// The subset of sample values used here. Other fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleValues {
    pub wind_speed: Option<f64>,
    /// Direction the wind blows from, degrees clockwise from north
    pub wind_direction: Option<f64>,
}

/// Wind at one location and hour, missing fields defaulted to 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    pub speed: f64,
    pub direction_deg: f64,
}

impl From<&SampleValues> for WindSample {
    fn from(values: &SampleValues) -> Self {
        Self {
            speed: values.wind_speed.unwrap_or(0.0),
            direction_deg: values.wind_direction.unwrap_or(0.0),
        }
    }
}

impl TomorrowClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Fetch the hourly forecast series for a location.
    ///
    /// The series is returned in provider order (chronological). A response
    /// without an hourly timeline yields an empty series.
    pub async fn fetch_hourly(&self, lat: f64, lon: f64) -> Result<Vec<HourlySample>, AppError> {
        let url = format!("{}{}", self.base_url, FORECAST_PATH);
        let location = format!("{},{}", lat, lon);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("timesteps", "1h"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("tomorrow.io request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "tomorrow.io returned HTTP {} for {}",
                response.status(),
                location
            )));
        }

        let body: ForecastResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("tomorrow.io JSON parse error: {}", e))
        })?;

        Ok(body.timelines.hourly)
    }
}

/// Select the first sample at or after `target`.
///
/// Relies on the provider's chronological ordering: the series is scanned in
/// order and the first match wins. Samples with an unparseable `time` are
/// never selected.
pub fn select_sample(series: &[HourlySample], target: DateTime<Utc>) -> Option<&HourlySample> {
    series.iter().find(|sample| match parse_sample_time(&sample.time) {
        Some(time) => time >= target,
        None => {
            tracing::warn!("Ignoring forecast sample with invalid time '{}'", sample.time);
            false
        }
    })
}

fn parse_sample_time(time: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(time)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
