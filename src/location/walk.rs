//! Module to simulate a device wandering around a starting point.

use super::Location;
use rand::distr::Open01;
use rand::Rng;

/// Approximate length of one degree of latitude, in meters.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Generates a random walk of `points` locations, starting at `start` and
/// moving `step_meters` in a random direction at each step.
pub fn random_walk<R: Rng>(
    rng: &mut R,
    start: Location,
    step_meters: f64,
    points: usize,
) -> Vec<Location> {
    let mut current = start;
    let mut walk = Vec::with_capacity(points);
    for _ in 0..points {
        walk.push(current);

        let unit: f64 = rng.sample(Open01);
        let bearing = unit * 2.0 * std::f64::consts::PI;
        let dlat = step_meters * bearing.cos() / METERS_PER_DEGREE;
        let dlon = step_meters * bearing.sin()
            / (METERS_PER_DEGREE * current.latitude.to_radians().cos().max(1e-6));
        current = Location {
            latitude: (current.latitude + dlat).clamp(-90.0, 90.0),
            longitude: wrap_longitude(current.longitude + dlon),
        };
    }
    walk
}

/// Wraps a longitude into the [-180, 180) range.
fn wrap_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}
