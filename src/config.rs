use std::time::Duration;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// tomorrow.io API key (static key, not the OAuth credential).
    pub tomorrow_api_key: String,
    pub tomorrow_api_url: String,
    pub strava_client_id: String,
    pub strava_client_secret: String,
    pub strava_redirect_uri: String,
    pub strava_oauth_url: String,
    pub strava_api_url: String,
    /// JSON file holding the persisted Strava credential.
    pub token_file: String,
    /// Where the browser is sent after a successful Strava authorization.
    pub frontend_url: String,
    /// Pause between consecutive forecast requests of one pipeline run.
    pub forecast_throttle: Duration,
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            tomorrow_api_key: var_or_warn("TOMORROW_API_KEY"),
            tomorrow_api_url: std::env::var("TOMORROW_API_URL")
                .unwrap_or_else(|_| "https://api.tomorrow.io".to_string()),
            strava_client_id: var_or_warn("STRAVA_CLIENT_ID"),
            strava_client_secret: var_or_warn("STRAVA_CLIENT_SECRET"),
            strava_redirect_uri: var_or_warn("STRAVA_REDIRECT_URI"),
            strava_oauth_url: std::env::var("STRAVA_OAUTH_URL")
                .unwrap_or_else(|_| "https://www.strava.com/oauth".to_string()),
            strava_api_url: std::env::var("STRAVA_API_URL")
                .unwrap_or_else(|_| "https://www.strava.com/api/v3".to_string()),
            token_file: std::env::var("TOKEN_FILE").unwrap_or_else(|_| "./tokens.json".to_string()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            forecast_throttle: Duration::from_millis(
                std::env::var("FORECAST_THROTTLE_MS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .expect("FORECAST_THROTTLE_MS must be a valid u64"),
            ),
            http_timeout: Duration::from_secs(
                std::env::var("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .expect("HTTP_TIMEOUT_SECS must be a valid u64"),
            ),
        }
    }
}

/// Read an optional-but-expected variable, warning when it is missing.
fn var_or_warn(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| {
        tracing::warn!("{} is not set, upstream calls that need it will fail", name);
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        // NOTE: set_var/remove_var is unsafe when tests run in parallel. This is
        // the only test in the crate touching these variables.
        unsafe {
            std::env::set_var("TOMORROW_API_KEY", "test-key");
            std::env::remove_var("PORT");
            std::env::remove_var("TOMORROW_API_URL");
            std::env::remove_var("TOKEN_FILE");
            std::env::remove_var("FORECAST_THROTTLE_MS");
            std::env::remove_var("HTTP_TIMEOUT_SECS");
        }

        let config = AppConfig::from_env();

        assert_eq!(config.port, 4000);
        assert_eq!(config.tomorrow_api_key, "test-key");
        assert_eq!(config.tomorrow_api_url, "https://api.tomorrow.io");
        assert_eq!(config.token_file, "./tokens.json");
        assert_eq!(config.forecast_throttle, Duration::from_millis(100));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }
}
