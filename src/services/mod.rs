pub mod forecast;
pub mod geometry;
pub mod strava;
pub mod tokens;
pub mod tomorrow;
pub mod wind;
