// Wind Route API v0.1
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod routes;
mod services;

use config::AppConfig;
use routes::auth::AuthState;
use routes::forecast::ForecastState;
use services::strava::{StravaClient, StravaSettings};
use services::tokens::{CredentialFile, TokenManager};
use services::tomorrow::TomorrowClient;

/// Wind Route API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wind Route API",
        version = "0.1.0",
        description = "Wind exposure analysis for planned routes. Fetches hourly \
            forecasts from tomorrow.io for every route point, computes the travel \
            bearing to the next point and scores the wind as headwind or tailwind. \
            Also brokers Strava OAuth and proxies route lookups.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Forecast", description = "Wind forecast along a route"),
        (name = "Auth", description = "Strava OAuth flow"),
        (name = "Strava", description = "Strava route pass-through"),
    ),
    paths(
        routes::health::health_check,
        routes::forecast::post_forecast,
        routes::auth::start_authorization,
        routes::auth::authorization_callback,
        routes::strava::list_routes,
        routes::strava::get_route,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::forecast::ForecastRequest,
            services::forecast::ForecastPoint,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wind_route_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    let tomorrow_client = TomorrowClient::new(
        &config.tomorrow_api_url,
        &config.tomorrow_api_key,
        config.http_timeout,
    );

    let strava_client = StravaClient::new(
        StravaSettings {
            client_id: config.strava_client_id.clone(),
            client_secret: config.strava_client_secret.clone(),
            redirect_uri: config.strava_redirect_uri.clone(),
            oauth_url: config.strava_oauth_url.clone(),
            api_url: config.strava_api_url.clone(),
        },
        config.http_timeout,
    );

    // Credential state is loaded once and shared by handle with every handler.
    let tokens = TokenManager::load(CredentialFile::new(&config.token_file), strava_client)
        .expect("Failed to load Strava credential file");

    let forecast_state = ForecastState {
        tomorrow: tomorrow_client,
        throttle: config.forecast_throttle,
    };

    let auth_state = AuthState {
        tokens: tokens.clone(),
        frontend_url: config.frontend_url.clone(),
    };

    // CORS — browser frontend on another origin posts routes and reads results
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    // Build router
    let forecast_routes = Router::new()
        .route("/forecast", post(routes::forecast::post_forecast))
        .with_state(forecast_state);

    let auth_routes = Router::new()
        .route("/auth/strava", get(routes::auth::start_authorization))
        .route("/auth/callback", get(routes::auth::authorization_callback))
        .with_state(auth_state);

    let strava_routes = Router::new()
        .route("/routes", get(routes::strava::list_routes))
        .route("/route/:id", get(routes::strava::get_route))
        .with_state(tokens.clone());

    let health_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(tokens);

    let app = Router::new()
        .merge(health_routes)
        .merge(forecast_routes)
        .merge(auth_routes)
        .merge(strava_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );
    tracing::info!(
        "Forecast requests throttled to one per {}ms",
        config.forecast_throttle.as_millis()
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
