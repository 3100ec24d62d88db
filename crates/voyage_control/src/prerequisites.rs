//! Stage eligibility from declared prerequisites.

use voyage_core::{Stage, StateField, VoyageState};

use crate::AgentRegistry;

/// Prerequisites of `stage` missing from `state`.
///
/// Besides the registry's declarations, bunker planning waits for the
/// weather forecast and consumption when the request needs weather. A failed
/// weather stage leaves bunker planning blocked.
pub fn unmet(registry: &AgentRegistry, stage: Stage, state: &VoyageState) -> Vec<StateField> {
    let mut missing: Vec<StateField> = registry
        .prerequisites(stage)
        .iter()
        .copied()
        .filter(|field| !state.has(*field))
        .collect();
    if stage == Stage::Bunker && state.request.intent.needs_weather {
        for field in [StateField::WeatherForecast, StateField::WeatherConsumption] {
            if !state.has(field) && !missing.contains(&field) {
                missing.push(field);
            }
        }
    }
    missing
}

pub fn is_eligible(registry: &AgentRegistry, stage: Stage, state: &VoyageState) -> bool {
    unmet(registry, stage, state).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_core::test_fixtures::{base_state, sgsin_aefjr_route};
    use voyage_core::{StageStatus, WeatherConsumption};

    #[test]
    fn test_route_has_no_prerequisites() {
        let registry = AgentRegistry::default();
        assert!(is_eligible(&registry, Stage::Route, &base_state()));
    }

    #[test]
    fn test_weather_needs_timeline() {
        let registry = AgentRegistry::default();
        let mut state = base_state();
        state.route = Some(sgsin_aefjr_route());
        assert_eq!(
            unmet(&registry, Stage::Weather, &state),
            vec![StateField::VesselTimeline]
        );
    }

    #[test]
    fn test_bunker_stays_blocked_when_weather_failed() {
        let registry = AgentRegistry::default();
        let mut state = base_state();
        state.route = Some(sgsin_aefjr_route());
        state.weather_consumption = Some(WeatherConsumption {
            increase_percent: 5.0,
            additional_fuel_mt: 15.0,
        });
        assert_eq!(
            unmet(&registry, Stage::Bunker, &state),
            vec![StateField::WeatherForecast]
        );

        state.stage_status.insert(Stage::Weather, StageStatus::Failed);
        assert!(!is_eligible(&registry, Stage::Bunker, &state));
        assert_eq!(
            unmet(&registry, Stage::Bunker, &state),
            vec![StateField::WeatherForecast]
        );
    }

    #[test]
    fn test_bunker_ignores_weather_when_not_requested() {
        let registry = AgentRegistry::default();
        let mut state = base_state();
        state.request.intent.needs_weather = false;
        state.route = Some(sgsin_aefjr_route());
        assert!(is_eligible(&registry, Stage::Bunker, &state));
    }
}
