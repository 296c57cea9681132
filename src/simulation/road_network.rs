//! Lane grid derived from the vehicle list
//!
//! The network is rebuilt from vehicle positions whenever the orchestrator
//! needs to look at occupancy. Building it is also where the uniqueness
//! invariant is checked: a second vehicle in a cell fails the build.

use std::collections::HashMap;

use super::error::{SimError, SimResult};
use super::lane::Lane;
use super::rule::offset_index;
use super::topology::Topology;
use super::types::{BoundaryMode, CellRef, Direction, LaneId, RoadId, VehicleId, VehicleStatus};
use super::vehicle::SimVehicle;

/// Occupancy of every lane of every road at one instant
#[derive(Debug, Clone, Default)]
pub struct SimRoadNetwork {
    /// Lanes indexed by road, then lane
    roads: Vec<Vec<Lane>>,
    /// Travel direction of each road
    directions: Vec<Direction>,
    /// Status of every placed vehicle
    statuses: HashMap<VehicleId, VehicleStatus>,
}

impl SimRoadNetwork {
    /// Place every vehicle on a fresh set of lanes
    pub fn build<'a>(
        topology: &Topology,
        vehicles: impl IntoIterator<Item = &'a SimVehicle>,
    ) -> SimResult<Self> {
        let roads = topology
            .roads
            .iter()
            .map(|road| road.lanes.iter().map(|_| Lane::new(road.length)).collect())
            .collect();
        let mut network = Self {
            roads,
            directions: topology.roads.iter().map(|r| r.direction).collect(),
            statuses: HashMap::new(),
        };

        for vehicle in vehicles {
            if vehicle.status == VehicleStatus::Removed {
                return Err(SimError::InvariantViolation(format!(
                    "removed vehicle {} is still on the road",
                    vehicle.id.0 .0
                )));
            }
            let lane = network
                .roads
                .get_mut(vehicle.road.0)
                .and_then(|lanes| lanes.get_mut(vehicle.lane.0))
                .ok_or_else(|| {
                    SimError::InvariantViolation(format!(
                        "vehicle {} is on missing lane {} of road {}",
                        vehicle.id.0 .0, vehicle.lane.0, vehicle.road.0
                    ))
                })?;
            lane.place(vehicle.position, vehicle.id).map_err(|e| match e {
                SimError::InvariantViolation(msg) => SimError::InvariantViolation(format!(
                    "{} (road {} lane {})",
                    msg, vehicle.road.0, vehicle.lane.0
                )),
                other => other,
            })?;
            if network.statuses.insert(vehicle.id, vehicle.status).is_some() {
                return Err(SimError::InvariantViolation(format!(
                    "vehicle id {} appears twice",
                    vehicle.id.0 .0
                )));
            }
        }
        Ok(network)
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn lane_count(&self, road: RoadId) -> usize {
        self.roads.get(road.0).map_or(0, Vec::len)
    }

    pub fn lane(&self, road: RoadId, lane: LaneId) -> Option<&Lane> {
        self.roads.get(road.0)?.get(lane.0)
    }

    pub fn lanes(&self, road: RoadId) -> &[Lane] {
        self.roads.get(road.0).map_or(&[], Vec::as_slice)
    }

    pub fn direction(&self, road: RoadId) -> Option<Direction> {
        self.directions.get(road.0).copied()
    }

    /// Occupancy array of one lane
    pub fn occupancy(&self, road: RoadId, lane: LaneId) -> SimResult<Vec<bool>> {
        self.lane(road, lane)
            .map(Lane::occupancy)
            .ok_or(SimError::UnknownLane { road, lane })
    }

    /// Whether a cell exists and is empty
    pub fn is_free(&self, cell: CellRef) -> bool {
        self.lane(cell.road, cell.lane)
            .is_some_and(|lane| lane.is_free(cell.position))
    }

    pub fn occupant(&self, cell: CellRef) -> Option<VehicleId> {
        self.lane(cell.road, cell.lane)?.get(cell.position)
    }

    pub fn status_at(&self, cell: CellRef) -> Option<VehicleStatus> {
        self.occupant(cell)
            .and_then(|id| self.statuses.get(&id).copied())
    }

    /// Whether a Broken vehicle sits within `look_ahead` cells in front of `cell`
    pub fn broken_ahead(&self, cell: CellRef, look_ahead: u32, boundary: BoundaryMode) -> bool {
        let Some(lane) = self.lane(cell.road, cell.lane) else {
            return false;
        };
        let Some(direction) = self.direction(cell.road) else {
            return false;
        };
        let step = direction.step();
        (1..=look_ahead as isize)
            .filter_map(|distance| offset_index(cell.position, step * distance, lane.len(), boundary))
            .take_while(|&index| index != cell.position)
            .any(|index| self.status_at(CellRef { position: index, ..cell }) == Some(VehicleStatus::Broken))
    }

    /// Vehicles currently on a road, all lanes together
    pub fn road_population(&self, road: RoadId) -> usize {
        self.lanes(road).iter().map(Lane::count).sum()
    }

    pub fn total_vehicles(&self) -> usize {
        self.statuses.len()
    }
}

/// Cells taken in the generation being committed. First claim wins.
#[derive(Debug, Default)]
pub struct CellClaims {
    claims: HashMap<CellRef, VehicleId>,
}

impl CellClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a cell, returning false when someone else already holds it
    pub fn claim(&mut self, cell: CellRef, id: VehicleId) -> bool {
        match self.claims.get(&cell) {
            Some(holder) => *holder == id,
            None => {
                self.claims.insert(cell, id);
                true
            }
        }
    }

    /// Give up a cell held by `id`
    pub fn release(&mut self, cell: CellRef, id: VehicleId) {
        if self.claims.get(&cell) == Some(&id) {
            self.claims.remove(&cell);
        }
    }

    pub fn is_claimed(&self, cell: CellRef) -> bool {
        self.claims.contains_key(&cell)
    }
}
