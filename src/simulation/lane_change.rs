//! Lane-change arbitration within one road

use rand::seq::IndexedRandom;
use rand::Rng;

use super::config::SimParams;
use super::road_network::SimRoadNetwork;
use super::types::{BoundaryMode, CellRef, LaneId};
use super::vehicle::SimVehicle;

/// Trigger probability for a vehicle, raised when a Broken vehicle is close ahead
pub fn lane_change_probability(
    vehicle: &SimVehicle,
    network: &SimRoadNetwork,
    params: &SimParams,
    boundary: BoundaryMode,
) -> f64 {
    if network.broken_ahead(vehicle.cell(), params.look_ahead, boundary) {
        params.blocked_lane_change_prob
    } else {
        params.lane_change_prob
    }
}

/// Adjacent lanes whose same-index cell is free
pub fn free_neighbour_lanes(vehicle: &SimVehicle, network: &SimRoadNetwork) -> Vec<CellRef> {
    let lanes = network.lane_count(vehicle.road);
    let lane = vehicle.lane.0;
    [lane.checked_sub(1), lane.checked_add(1)]
        .into_iter()
        .flatten()
        .filter(|&l| l < lanes)
        .map(|l| vehicle.cell().with_lane(LaneId(l)))
        .filter(|cell| network.is_free(*cell))
        .collect()
}

/// Roll for a lane change and pick its target.
///
/// Exactly one attempt per vehicle per generation. When both neighbours are
/// free one is chosen at random.
pub fn find_lane_change_target(
    vehicle: &SimVehicle,
    network: &SimRoadNetwork,
    params: &SimParams,
    boundary: BoundaryMode,
    rng: &mut impl Rng,
) -> Option<CellRef> {
    if !vehicle.is_active() || network.lane_count(vehicle.road) < 2 {
        return None;
    }
    let probability = lane_change_probability(vehicle, network, params, boundary);
    if !rng.random_bool(probability) {
        return None;
    }
    free_neighbour_lanes(vehicle, network).choose(rng).copied()
}
