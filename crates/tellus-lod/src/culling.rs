//! Per-chunk visibility tests against a spherical planet.
//!
//! All positions are in one space (world space in practice); the planet
//! center is passed explicitly.

use glam::DVec3;

/// Conservative horizon test for a chunk's bounding sphere.
///
/// The point of the bounding sphere closest to the observer is projected onto
/// the planet's outward direction; the chunk is hidden only when even that
/// point faces away from the observer.
pub fn is_above_horizon(chunk_center: DVec3, bounding_radius: f64, planet_center: DVec3, observer: DVec3) -> bool {
    let to_observer = observer - chunk_center;
    let distance = to_observer.length();
    if distance <= bounding_radius {
        return true;
    }
    let closest = chunk_center + to_observer * (bounding_radius / distance);
    let conservative_normal = (closest - planet_center).normalize_or_zero();
    let observer_direction = (observer - planet_center).normalize_or_zero();
    observer_direction.dot(conservative_normal) >= 0.0
}

/// Angle subtended by a sphere of `radius` seen from `observer`, small-angle
/// approximation. Infinite when the observer is inside the sphere.
pub fn angular_size(center: DVec3, radius: f64, observer: DVec3) -> f64 {
    let distance = (observer - center).length();
    if distance <= radius {
        f64::INFINITY
    } else {
        2.0 * radius / distance
    }
}

/// Returns true if the sphere covers at least `min_fraction` of the field of view.
pub fn is_large_enough_on_screen(center: DVec3, radius: f64, observer: DVec3, fov: f64, min_fraction: f64) -> bool {
    angular_size(center, radius, observer) / fov >= min_fraction
}

/// Distance from the observer to the chunk measured along the planet surface
/// plane at the chunk, ignoring altitude.
pub fn tangential_distance(chunk_center: DVec3, planet_center: DVec3, observer: DVec3) -> f64 {
    let offset = observer - chunk_center;
    let up = (chunk_center - planet_center).normalize_or_zero();
    (offset - up * offset.dot(up)).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS: f64 = 1_000.0;

    fn observer(altitude: f64) -> DVec3 {
        DVec3::new(0.0, RADIUS + altitude, 0.0)
    }

    #[test]
    fn test_chunk_below_observer_is_visible() {
        let chunk = DVec3::new(0.0, RADIUS, 0.0);
        assert!(is_above_horizon(chunk, 10.0, DVec3::ZERO, observer(50.0)));
    }

    #[test]
    fn test_chunk_on_far_side_is_culled() {
        let chunk = DVec3::new(0.0, -RADIUS, 0.0);
        assert!(!is_above_horizon(chunk, 10.0, DVec3::ZERO, observer(50.0)));
    }

    #[test]
    fn test_equator_chunk_is_kept_conservatively() {
        let chunk = DVec3::new(RADIUS, 0.0, 0.0);
        assert!(is_above_horizon(chunk, 10.0, DVec3::ZERO, observer(50.0)));
    }

    #[test]
    fn test_observer_inside_bounding_sphere_sees_chunk() {
        let chunk = DVec3::new(0.0, -RADIUS, 0.0);
        let inside = chunk + DVec3::X;
        assert!(is_above_horizon(chunk, 10.0, DVec3::ZERO, inside));
        assert!(is_large_enough_on_screen(chunk, 10.0, inside, 1.0, 0.5));
    }

    #[test]
    fn test_horizon_test_follows_planet_center() {
        let offset = DVec3::new(5_000.0, 0.0, -3_000.0);
        let chunk = DVec3::new(0.0, -RADIUS, 0.0) + offset;
        assert!(!is_above_horizon(chunk, 10.0, offset, observer(50.0) + offset));
    }

    #[test]
    fn test_distant_small_chunk_is_too_small() {
        let fov = std::f64::consts::FRAC_PI_3;
        let chunk = DVec3::ZERO;
        assert!(is_large_enough_on_screen(chunk, 10.0, DVec3::new(0.0, 0.0, 1_000.0), fov, 0.002));
        // 2 * 10 / 1e7 = 2e-6 rad, far below 0.2% of the field of view.
        assert!(!is_large_enough_on_screen(chunk, 10.0, DVec3::new(0.0, 0.0, 1e7), fov, 0.002));
    }

    #[test]
    fn test_tangential_distance_ignores_altitude() {
        let chunk = DVec3::new(0.0, RADIUS, 0.0);
        assert!(tangential_distance(chunk, DVec3::ZERO, observer(500.0)) < 1e-9);
        let beside = DVec3::new(120.0, RADIUS + 900.0, 0.0);
        assert!((tangential_distance(chunk, DVec3::ZERO, beside) - 120.0).abs() < 1e-9);
    }
}
