//! Weather penalty on fuel consumption.

use crate::{WeatherConsumption, WeatherSample};

/// Consumption increase (percent) by significant wave height, upper bound in metres.
const WAVE_BANDS: &[(f64, f64)] = &[
    (1.0, 0.0),
    (2.0, 5.0),
    (3.0, 10.0),
    (4.0, 15.0),
    (5.0, 20.0),
    (6.0, 30.0),
];
const SEVERE_SEA_PERCENT: f64 = 40.0;
const STRONG_WIND_KNOTS: f64 = 25.0;
const STRONG_WIND_PERCENT: f64 = 5.0;

fn sample_penalty(sample: &WeatherSample) -> f64 {
    let wave = sample.conditions.wave_height_m;
    let sea = WAVE_BANDS
        .iter()
        .find(|(upper, _)| wave < *upper)
        .map_or(SEVERE_SEA_PERCENT, |(_, percent)| *percent);
    let wind = if sample.conditions.wind_speed_knots > STRONG_WIND_KNOTS {
        STRONG_WIND_PERCENT
    } else {
        0.0
    };
    sea + wind
}

/// Mean penalty over the forecast samples applied to the calm-water
/// consumption of the voyage.
pub fn consumption_impact(samples: &[WeatherSample], base_consumption_mt: f64) -> WeatherConsumption {
    if samples.is_empty() {
        return WeatherConsumption {
            increase_percent: 0.0,
            additional_fuel_mt: 0.0,
        };
    }
    let increase_percent =
        samples.iter().map(sample_penalty).sum::<f64>() / samples.len() as f64;
    WeatherConsumption {
        increase_percent,
        additional_fuel_mt: base_consumption_mt.max(0.0) * increase_percent / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ForecastConfidence, WeatherConditions, Waypoint};
    use chrono::Utc;

    fn sample(wave_height_m: f64, wind_speed_knots: f64) -> WeatherSample {
        WeatherSample {
            position: Waypoint::new(0.0, 0.0),
            timestamp: Utc::now(),
            conditions: WeatherConditions {
                wave_height_m,
                wind_speed_knots,
                wind_direction_deg: 270.0,
            },
            confidence: ForecastConfidence::High,
        }
    }

    #[test]
    fn test_calm_sea_adds_nothing() {
        let impact = consumption_impact(&[sample(0.5, 8.0)], 300.0);
        assert!(impact.increase_percent.abs() < 1e-9);
        assert!(impact.additional_fuel_mt.abs() < 1e-9);
    }

    #[test]
    fn test_penalty_is_averaged_over_samples() {
        // 5 % and 15 % + 5 % wind.
        let impact = consumption_impact(&[sample(1.5, 10.0), sample(3.5, 30.0)], 300.0);
        assert!((impact.increase_percent - 12.5).abs() < 1e-9);
        assert!((impact.additional_fuel_mt - 37.5).abs() < 1e-9);
        assert!((impact.factor() - 1.125).abs() < 1e-9);
    }

    #[test]
    fn test_no_samples_means_no_penalty() {
        let impact = consumption_impact(&[], 300.0);
        assert!(impact.increase_percent.abs() < 1e-9);
    }

    #[test]
    fn test_severe_sea_uses_top_band() {
        let impact = consumption_impact(&[sample(8.0, 0.0)], 100.0);
        assert!((impact.additional_fuel_mt - 40.0).abs() < 1e-9);
    }
}
