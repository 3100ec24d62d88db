//! Per-stage declared prerequisites and outputs.

use serde::{Deserialize, Serialize};
use voyage_core::{Intent, Stage, StateField};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub stage: Stage,
    pub description: String,
    /// Fields that must be present before the stage may run.
    pub prerequisites: Vec<StateField>,
    /// Fields the stage is expected to produce.
    pub outputs: Vec<StateField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistry {
    pub agents: Vec<AgentSpec>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        let spec = |stage, description: &str, prerequisites: &[StateField], outputs: &[StateField]| {
            AgentSpec {
                stage,
                description: description.to_string(),
                prerequisites: prerequisites.to_vec(),
                outputs: outputs.to_vec(),
            }
        };
        Self {
            agents: vec![
                spec(
                    Stage::Route,
                    "Sea route between the two ports and the vessel's position timeline",
                    &[],
                    &[StateField::Route, StateField::VesselTimeline],
                ),
                spec(
                    Stage::Compliance,
                    "Emission control areas crossed and LSMGO required inside them",
                    &[StateField::RouteWaypoints],
                    &[StateField::Compliance],
                ),
                spec(
                    Stage::Weather,
                    "Marine forecast along the timeline and its effect on consumption",
                    &[StateField::VesselTimeline],
                    &[StateField::WeatherForecast, StateField::WeatherConsumption],
                ),
                spec(
                    Stage::Bunker,
                    "Bunker ports, prices, ROB tracking and single or multi-stop plans",
                    &[StateField::RouteWaypoints],
                    &[
                        StateField::BunkerPorts,
                        StateField::PortPrices,
                        StateField::BunkerAnalysis,
                        StateField::RobTracking,
                    ],
                ),
            ],
        }
    }
}

impl AgentRegistry {
    pub fn get(&self, stage: Stage) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.stage == stage)
    }

    pub fn prerequisites(&self, stage: Stage) -> &[StateField] {
        match self.get(stage) {
            Some(agent) => &agent.prerequisites,
            None => &[],
        }
    }

    /// Outputs the stage must produce for this request. Weather consumption
    /// only matters when the request also asks for bunker planning.
    pub fn required_outputs(&self, stage: Stage, intent: Intent) -> Vec<StateField> {
        let declared = self
            .get(stage)
            .map_or_else(|| vec![stage.primary_output()], |a| a.outputs.clone());
        declared
            .into_iter()
            .filter(|field| *field != StateField::WeatherConsumption || intent.needs_bunker)
            .collect()
    }
}
