//! Strava OAuth HTTP endpoints.
//!
//! - GET /auth/strava           redirect to Strava's consent page
//! - GET /auth/callback?code=…  exchange the code and hand the token to the frontend

use axum::extract::{Query, State};
use axum::response::Redirect;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::errors::{AppError, ErrorResponse};
use crate::services::tokens::TokenManager;

/// Shared state for the OAuth endpoints.
#[derive(Clone)]
pub(crate) struct AuthState {
    pub(crate) tokens: TokenManager,
    pub(crate) frontend_url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    /// Authorization code issued by Strava
    pub code: Option<String>,
    /// Set by Strava when the user denied access
    pub error: Option<String>,
}

/// Redirect the browser to Strava's authorization page.
#[utoipa::path(
    get,
    path = "/auth/strava",
    tag = "Auth",
    responses(
        (status = 303, description = "Redirect to the Strava authorization page"),
    )
)]
pub async fn start_authorization(State(state): State<AuthState>) -> Result<Redirect, AppError> {
    let url = state.tokens.strava().authorize_url()?;
    Ok(Redirect::to(url.as_str()))
}

/// Complete the authorization-code grant.
///
/// Stores and persists the issued credential, then redirects to the frontend
/// with the access token in the query string.
#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "Auth",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Redirect to the frontend with the access token"),
        (status = 500, description = "Code exchange failed", body = ErrorResponse),
    )
)]
pub async fn authorization_callback(
    State(state): State<AuthState>,
    Query(params): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    let code = match (params.code, params.error) {
        (Some(code), _) => code,
        (None, Some(error)) => {
            return Err(AppError::AuthenticationFailed(format!(
                "authorization denied: {}",
                error
            )))
        }
        (None, None) => {
            return Err(AppError::AuthenticationFailed(
                "callback without code".to_string(),
            ))
        }
    };

    let credential = state
        .tokens
        .strava()
        .exchange_code(&code)
        .await
        .map_err(|e| AppError::AuthenticationFailed(e.to_string()))?;
    let access_token = credential.access_token.clone();

    state
        .tokens
        .store_authorization(credential)
        .await
        .map_err(|e| AppError::AuthenticationFailed(e.to_string()))?;

    let target = reqwest::Url::parse_with_params(
        &format!("{}/", state.frontend_url.trim_end_matches('/')),
        &[("access_token", access_token.as_str())],
    )
    .map_err(|e| AppError::InternalError(format!("Invalid FRONTEND_URL: {}", e)))?;

    Ok(Redirect::to(target.as_str()))
}
