//! Vessel position samples along the route at a fixed interval.

use chrono::{DateTime, Duration, Utc};

use crate::geo::{cumulative_distances, position_at};
use crate::{RouteData, TimelineError, TimelinePoint};

const MAX_POINTS: usize = 10_000;

/// Samples the vessel's position every `interval_hours` from departure,
/// always ending with a sample at arrival.
pub fn sample_timeline(
    route: &RouteData,
    departure: DateTime<Utc>,
    speed_knots: f64,
    interval_hours: f64,
) -> Result<Vec<TimelinePoint>, TimelineError> {
    if route.waypoints.is_empty() {
        return Err(TimelineError::NoWaypoints);
    }
    if speed_knots.is_nan() || speed_knots <= 0.0 {
        return Err(TimelineError::InvalidSpeed(speed_knots));
    }
    if interval_hours.is_nan() || interval_hours <= 0.0 {
        return Err(TimelineError::InvalidInterval(interval_hours));
    }

    let total_nm = route.distance_nm.max(0.0);
    let total_hours = total_nm / speed_knots;
    let cumulative = cumulative_distances(&route.waypoints, total_nm);

    let mut hours = Vec::new();
    let mut t = 0.0;
    while t < total_hours && hours.len() < MAX_POINTS {
        hours.push(t);
        t += interval_hours;
    }
    hours.push(total_hours);

    let points = hours
        .into_iter()
        .filter_map(|elapsed| {
            let distance = (elapsed * speed_knots).min(total_nm);
            let position = position_at(&route.waypoints, &cumulative, distance)?;
            #[allow(clippy::cast_possible_truncation)]
            let offset = Duration::seconds((elapsed * 3600.0).round() as i64);
            Some(TimelinePoint {
                position,
                timestamp: departure + offset,
                distance_from_origin_nm: distance,
            })
        })
        .collect();
    Ok(points)
}
