//! Great-circle bearing between two coordinates.

/// Initial compass bearing (degrees, clockwise from north, in `[0, 360)`)
/// from point 1 to point 2, using the forward-azimuth formula.
///
/// Inputs are degrees. Out-of-range or non-finite inputs are not validated.
/// Identical points have no defined bearing and yield 0°.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    if lat1 == lat2 && lon1 == lon2 {
        return 0.0;
    }

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let y = delta_lon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}
