//! Strava OAuth and route API client.
//!
//! Covers the authorization-code and refresh-token grants plus the two
//! route lookups that are proxied verbatim to the frontend.

use reqwest::header::AUTHORIZATION;
use std::time::Duration;

use crate::errors::AppError;
use crate::services::tokens::Credential;

/// Scopes requested during authorization.
const STRAVA_SCOPES: &str = "read,activity:read_all,profile:read_all";

/// Static OAuth client settings.
#[derive(Debug, Clone)]
pub struct StravaSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub oauth_url: String,
    pub api_url: String,
}

/// Client for Strava's OAuth endpoints and REST API.
#[derive(Debug, Clone)]
pub struct StravaClient {
    client: reqwest::Client,
    settings: StravaSettings,
}

impl StravaClient {
    pub fn new(settings: StravaSettings, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            settings: StravaSettings {
                oauth_url: settings.oauth_url.trim_end_matches('/').to_string(),
                api_url: settings.api_url.trim_end_matches('/').to_string(),
                ..settings
            },
        }
    }

    /// URL the user is sent to in order to grant access.
    pub fn authorize_url(&self) -> Result<reqwest::Url, AppError> {
        reqwest::Url::parse_with_params(
            &format!("{}/authorize", self.settings.oauth_url),
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("approval_prompt", "force"),
                ("scope", STRAVA_SCOPES),
            ],
        )
        .map_err(|e| AppError::InternalError(format!("Invalid Strava OAuth URL: {}", e)))
    }

    /// Exchange an authorization code for a credential.
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, AppError> {
        self.token_request(&[("grant_type", "authorization_code"), ("code", code)])
            .await
    }

    /// Obtain a fresh credential with the refresh-token grant.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential, AppError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, grant: &[(&str, &str)]) -> Result<Credential, AppError> {
        let mut params = vec![
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
        ];
        params.extend_from_slice(grant);

        let response = self
            .client
            .post(format!("{}/token", self.settings.oauth_url))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Strava token request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Strava token endpoint returned HTTP {}",
                response.status()
            )));
        }

        response.json::<Credential>().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Strava token response parse error: {}", e))
        })
    }

    /// Routes of the authenticated athlete, as returned by Strava.
    pub async fn list_routes(&self, access_token: &str) -> Result<serde_json::Value, AppError> {
        self.api_get("athletes/@me/routes", access_token).await
    }

    /// A single route, as returned by Strava.
    pub async fn get_route(
        &self,
        access_token: &str,
        route_id: &str,
    ) -> Result<serde_json::Value, AppError> {
        self.api_get(&format!("routes/{}", route_id), access_token)
            .await
    }

    async fn api_get(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> Result<serde_json::Value, AppError> {
        let url = format!("{}/{}", self.settings.api_url, endpoint);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Strava request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Strava returned HTTP {} for {}",
                response.status(),
                endpoint
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Strava JSON parse error: {}", e))
        })
    }
}
