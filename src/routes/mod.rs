pub mod auth;
pub mod forecast;
pub mod health;
pub mod strava;
