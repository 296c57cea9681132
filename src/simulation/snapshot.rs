//! Serializable copy of a simulation's state

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::config::SimParams;
use super::error::{SimError, SimResult};
use super::road_network::SimRoadNetwork;
use super::stats::SimStats;
use super::topology::Topology;
use super::types::{BoundaryMode, VehicleStatus};
use super::vehicle::SimVehicle;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to rebuild a simulation except its random stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub version: u32,
    pub topology: Topology,
    pub params: SimParams,
    pub boundary_mode: BoundaryMode,
    pub generation: u64,
    /// Next vehicle id to hand out
    pub next_id: usize,
    pub paused: bool,
    pub stats: SimStats,
    pub vehicles: Vec<SimVehicle>,
}

impl SimulationSnapshot {
    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SimError::InvalidSnapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        serde_json::from_str(json).map_err(|e| SimError::InvalidSnapshot(e.to_string()))
    }

    /// Check that the snapshot describes a state the engine could have produced
    pub fn validate(&self) -> SimResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(invalid(format!(
                "unsupported version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        self.topology
            .validate()
            .map_err(|e| invalid(e.to_string()))?;
        self.params.validate().map_err(|e| invalid(e.to_string()))?;

        let mut ids = HashSet::new();
        for vehicle in &self.vehicles {
            let id = vehicle.id.0 .0;
            if !ids.insert(vehicle.id) {
                return Err(invalid(format!("vehicle id {} appears twice", id)));
            }
            if id >= self.next_id {
                return Err(invalid(format!(
                    "vehicle id {} is not below the id counter {}",
                    id, self.next_id
                )));
            }
            if vehicle.status == VehicleStatus::Removed {
                return Err(invalid(format!("vehicle {} is marked removed", id)));
            }
            let Some(road) = self.topology.road(vehicle.road) else {
                return Err(invalid(format!("vehicle {} is on unknown road {}", id, vehicle.road.0)));
            };
            if road.direction != vehicle.direction {
                return Err(invalid(format!(
                    "vehicle {} travels {:?} on a {:?} road",
                    id, vehicle.direction, road.direction
                )));
            }
            if self.topology.road(vehicle.origin_road).is_none() {
                return Err(invalid(format!(
                    "vehicle {} comes from unknown road {}",
                    id, vehicle.origin_road.0
                )));
            }
            if vehicle.in_transition() {
                let target_ok = vehicle.target.is_some_and(|t| {
                    self.topology
                        .road(t.road)
                        .is_some_and(|r| t.lane.0 < r.lanes.len() && t.position < r.length)
                });
                if !target_ok {
                    return Err(invalid(format!("vehicle {} has no valid target", id)));
                }
            }
        }

        // Lane range, position range and shared cells
        SimRoadNetwork::build(&self.topology, &self.vehicles).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> SimError {
    SimError::InvalidSnapshot(message.into())
}
