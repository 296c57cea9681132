//! Intersection turn detection and arbitration
//!
//! Every road that passes through the intersection is centred at
//! `length / 2`. A vehicle close enough to that centre, on a lane listed in
//! the turn table, may start a turn onto the centre cell of the destination
//! lane.

use std::collections::HashMap;

use rand::Rng;

use super::road_network::SimRoadNetwork;
use super::topology::{IntersectionSpec, Topology, TurnRule};
use super::types::{CellRef, LaneId, RoadId};
use super::vehicle::SimVehicle;

/// The shared crossing of the participating roads
#[derive(Debug, Clone)]
pub struct SimIntersection {
    /// Centre cell index of each participating road
    centers: HashMap<RoadId, usize>,
    /// Cells either side of the centre where turns are considered
    detection_range: usize,
    /// Turn table keyed by source lane
    turns: HashMap<(RoadId, LaneId), TurnRule>,
}

impl SimIntersection {
    /// Resolve an intersection description against a validated topology
    pub fn new(spec: &IntersectionSpec, topology: &Topology) -> Self {
        let centers = spec
            .roads
            .iter()
            .filter_map(|road| topology.road(*road).map(|r| (*road, r.length / 2)))
            .collect();
        let turns = spec
            .turns
            .iter()
            .map(|turn| ((turn.from_road, turn.from_lane), *turn))
            .collect();
        Self {
            centers,
            detection_range: spec.detection_range(),
            turns,
        }
    }

    pub fn center(&self, road: RoadId) -> Option<usize> {
        self.centers.get(&road).copied()
    }

    pub fn detection_range(&self) -> usize {
        self.detection_range
    }

    /// Whether a cell lies within detection range of the centre
    pub fn is_near(&self, road: RoadId, position: usize) -> bool {
        self.center(road)
            .is_some_and(|center| center.abs_diff(position) <= self.detection_range)
    }

    /// Destination cell for vehicles turning off a lane
    pub fn turn_target(&self, road: RoadId, lane: LaneId) -> Option<CellRef> {
        let turn = self.turns.get(&(road, lane))?;
        let position = self.center(turn.to_road)?;
        Some(CellRef {
            road: turn.to_road,
            lane: turn.to_lane,
            position,
        })
    }

    /// Roll for a turn and return its destination when one should start.
    ///
    /// The destination must be free in the start-of-generation occupancy;
    /// whether it is still free at commit time is decided later.
    pub fn try_begin_turn(
        &self,
        vehicle: &SimVehicle,
        network: &SimRoadNetwork,
        turn_prob: f64,
        rng: &mut impl Rng,
    ) -> Option<CellRef> {
        if !vehicle.is_active() || !self.is_near(vehicle.road, vehicle.position) {
            return None;
        }
        let target = self.turn_target(vehicle.road, vehicle.lane)?;
        if !rng.random_bool(turn_prob) {
            return None;
        }
        network.is_free(target).then_some(target)
    }
}
