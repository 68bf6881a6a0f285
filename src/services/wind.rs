//! Projection of a forecast wind vector onto the direction of travel.

/// Signed wind impact for a segment travelled at `route_bearing_deg`, with the
/// wind reported as coming from `wind_direction_deg` at `wind_speed`.
///
/// `impact = wind_speed * cos(relative)`, where `relative` is the acute
/// angle in `[0, 180]` between bearing and wind direction. Result is in
/// `[-wind_speed, +wind_speed]`; a 90° offset gives ~0.
pub fn wind_impact(route_bearing_deg: f64, wind_direction_deg: f64, wind_speed: f64) -> f64 {
    let relative = relative_angle(route_bearing_deg, wind_direction_deg);
    wind_speed * relative.to_radians().cos()
}

/// Acute angular difference in degrees, `[0, 180]`.
///
/// Both angles are normalised first so that `d` and `d + 360k` compare equal.
fn relative_angle(a_deg: f64, b_deg: f64) -> f64 {
    let diff = (a_deg.rem_euclid(360.0) - b_deg.rem_euclid(360.0)).abs();
    diff.min(360.0 - diff)
}
