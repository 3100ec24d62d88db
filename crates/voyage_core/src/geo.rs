//! Great-circle helpers.

use crate::Waypoint;

const EARTH_RADIUS_NM: f64 = 3440.065;
const PROJECTION_STEPS: u32 = 50;

/// Great-circle distance between two points in nautical miles.
pub fn haversine_nm(a: Waypoint, b: Waypoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * h.sqrt().clamp(0.0, 1.0).asin()
}

/// Linear interpolation between two points; `t` in `[0, 1]`.
pub fn interpolate(a: Waypoint, b: Waypoint, t: f64) -> Waypoint {
    let t = t.clamp(0.0, 1.0);
    Waypoint::new(a.lat + (b.lat - a.lat) * t, a.lon + (b.lon - a.lon) * t)
}

/// Cumulative distance of each waypoint from the first, rescaled so the last
/// entry equals `total_nm`. Catalog routes follow shipping lanes, so the
/// stated distance is longer than the sum of straight legs.
pub fn cumulative_distances(waypoints: &[Waypoint], total_nm: f64) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(waypoints.len());
    let mut running = 0.0;
    for (i, point) in waypoints.iter().enumerate() {
        if i > 0 {
            running += haversine_nm(waypoints[i - 1], *point);
        }
        cumulative.push(running);
    }
    if running > 0.0 {
        let scale = total_nm / running;
        for distance in &mut cumulative {
            *distance *= scale;
        }
    } else if waypoints.len() > 1 {
        // Coincident waypoints: put the whole distance on the final leg.
        if let Some(last) = cumulative.last_mut() {
            *last = total_nm.max(0.0);
        }
    }
    cumulative
}

/// Position at `distance_nm` along the waypoint path, using the cumulative
/// distances from [`cumulative_distances`].
pub fn position_at(waypoints: &[Waypoint], cumulative: &[f64], distance_nm: f64) -> Option<Waypoint> {
    let first = *waypoints.first()?;
    if waypoints.len() == 1 || distance_nm <= 0.0 {
        return Some(first);
    }
    for i in 1..waypoints.len() {
        let (start, end) = (cumulative[i - 1], cumulative[i]);
        if distance_nm <= end {
            let span = end - start;
            let t = if span > 0.0 { (distance_nm - start) / span } else { 1.0 };
            return Some(interpolate(waypoints[i - 1], waypoints[i], t));
        }
    }
    waypoints.last().copied()
}

/// Index of the waypoint closest to `target`, or `None` for an empty path.
pub fn nearest_index(waypoints: &[Waypoint], target: Waypoint) -> Option<usize> {
    waypoints
        .iter()
        .enumerate()
        .map(|(i, point)| (i, haversine_nm(*point, target)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Closest approach of the path to `target`: distance along the path and
/// distance off it, both in nautical miles. Each leg is sampled at
/// `PROJECTION_STEPS` points.
pub fn project_onto(waypoints: &[Waypoint], cumulative: &[f64], target: Waypoint) -> Option<(f64, f64)> {
    let first = *waypoints.first()?;
    let mut best = (0.0, haversine_nm(first, target));
    for i in 1..waypoints.len() {
        let (start, end) = (cumulative[i - 1], cumulative[i]);
        for step in 1..=PROJECTION_STEPS {
            let t = f64::from(step) / f64::from(PROJECTION_STEPS);
            let off = haversine_nm(interpolate(waypoints[i - 1], waypoints[i], t), target);
            if off < best.1 {
                best = (start + (end - start) * t, off);
            }
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_of_latitude_is_sixty_nm() {
        let d = haversine_nm(Waypoint::new(0.0, 0.0), Waypoint::new(1.0, 0.0));
        assert!((d - 60.04).abs() < 0.1, "got {d}");
    }

    #[test]
    fn test_haversine_same_point_is_zero() {
        let p = Waypoint::new(1.26, 103.8);
        assert!(haversine_nm(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_cumulative_distances_scale_to_total() {
        let path = [
            Waypoint::new(0.0, 0.0),
            Waypoint::new(0.0, 1.0),
            Waypoint::new(0.0, 3.0),
        ];
        let cumulative = cumulative_distances(&path, 300.0);
        assert!(cumulative[0].abs() < 1e-9);
        assert!((cumulative[1] - 100.0).abs() < 1e-6);
        assert!((cumulative[2] - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_position_at_midpoint() {
        let path = [Waypoint::new(0.0, 0.0), Waypoint::new(0.0, 10.0)];
        let cumulative = cumulative_distances(&path, 100.0);
        let mid = position_at(&path, &cumulative, 50.0).unwrap();
        assert!((mid.lon - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_index_picks_closest() {
        let path = [
            Waypoint::new(0.0, 0.0),
            Waypoint::new(0.0, 10.0),
            Waypoint::new(0.0, 20.0),
        ];
        assert_eq!(nearest_index(&path, Waypoint::new(1.0, 11.0)), Some(1));
        assert_eq!(nearest_index(&[], Waypoint::new(1.0, 11.0)), None);
    }

    #[test]
    fn test_project_onto_finds_along_and_off_route_distance() {
        let path = [Waypoint::new(0.0, 0.0), Waypoint::new(0.0, 10.0)];
        let cumulative = cumulative_distances(&path, 600.0);
        let (along, off) = project_onto(&path, &cumulative, Waypoint::new(1.0, 5.0)).unwrap();
        assert!((along - 300.0).abs() < 1e-6, "got {along}");
        assert!((off - 60.0).abs() < 0.5, "got {off}");
        assert!(project_onto(&[], &[], Waypoint::new(0.0, 0.0)).is_none());
    }
}
