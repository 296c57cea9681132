//! Vehicle spawning, boundary insertion and population caps
//!
//! Free functions over the vehicle map, kept apart from the orchestrator so
//! the generation update in `world` reads as a sequence of phases.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

use super::config::SimParams;
use super::error::SimResult;
use super::road_network::SimRoadNetwork;
use super::stats::SimStats;
use super::topology::{initial_positions, LaneFill, Topology};
use super::types::{CellRef, LaneId, RoadId, SimId, VehicleId};
use super::vehicle::SimVehicle;

pub type VehicleMap = BTreeMap<VehicleId, SimVehicle>;

/// Hand out the next vehicle id
pub fn next_vehicle_id(next_id: &mut usize) -> VehicleId {
    let id = VehicleId(SimId(*next_id));
    *next_id += 1;
    id
}

/// Create a vehicle on a cell of the topology, travelling with its road
pub fn spawn_vehicle(
    topology: &Topology,
    cell: CellRef,
    next_id: &mut usize,
) -> Option<SimVehicle> {
    let road = topology.road(cell.road)?;
    if cell.lane.0 >= road.lanes.len() || cell.position >= road.length {
        return None;
    }
    Some(SimVehicle::new(next_vehicle_id(next_id), cell, road.direction))
}

/// Build the initial population described by the topology
pub fn populate(topology: &Topology, rng: &mut impl Rng, next_id: &mut usize) -> SimResult<VehicleMap> {
    let mut vehicles = VehicleMap::new();
    for (road_index, road) in topology.roads.iter().enumerate() {
        let road_id = RoadId(road_index);
        let footprint = topology.footprint(road_id);
        for (lane_index, fill) in road.lanes.iter().enumerate() {
            let reserved = match fill {
                LaneFill::Count(_) => footprint.as_ref(),
                _ => None,
            };
            for position in initial_positions(fill, road.length, reserved, rng) {
                let cell = CellRef {
                    road: road_id,
                    lane: LaneId(lane_index),
                    position,
                };
                if let Some(vehicle) = spawn_vehicle(topology, cell, next_id) {
                    vehicles.insert(vehicle.id, vehicle);
                }
            }
        }
    }
    // Rejects anything the fills produced twice
    SimRoadNetwork::build(topology, vehicles.values())?;
    Ok(vehicles)
}

/// Lane for an insertion: free entry cell, fewest vehicles, lowest index on ties
pub fn entry_lane(network: &SimRoadNetwork, road: RoadId, entry: usize) -> Option<LaneId> {
    network
        .lanes(road)
        .iter()
        .enumerate()
        .filter(|(_, lane)| lane.is_free(entry))
        .min_by_key(|(index, lane)| (lane.count(), *index))
        .map(|(index, _)| LaneId(index))
}

/// Roll for one insertion at the entry edge of every road below its cap
pub fn insert_at_entries(
    vehicles: &mut VehicleMap,
    topology: &Topology,
    params: &SimParams,
    rng: &mut impl Rng,
    next_id: &mut usize,
    stats: &mut SimStats,
) -> SimResult<()> {
    let probability = params.effective_insertion_prob();
    if probability <= 0.0 {
        return Ok(());
    }
    let network = SimRoadNetwork::build(topology, vehicles.values())?;
    for (road_index, road) in topology.roads.iter().enumerate() {
        let road_id = RoadId(road_index);
        if network.road_population(road_id) >= road.capacity() {
            continue;
        }
        if !rng.random_bool(probability) {
            continue;
        }
        let entry = road.entry_index();
        let Some(lane) = entry_lane(&network, road_id, entry) else {
            continue;
        };
        let cell = CellRef {
            road: road_id,
            lane,
            position: entry,
        };
        if let Some(vehicle) = spawn_vehicle(topology, cell, next_id) {
            debug!("Inserted vehicle {} at {}", vehicle.id.0 .0, cell);
            vehicles.insert(vehicle.id, vehicle);
            stats.insertions += 1;
        }
    }
    Ok(())
}

/// Remove surplus vehicles from every road above its cap.
///
/// Vehicles that are not Broken go first, in random order; Broken ones are
/// only removed when nothing else is left.
pub fn enforce_caps(
    vehicles: &mut VehicleMap,
    topology: &Topology,
    rng: &mut impl Rng,
    stats: &mut SimStats,
) {
    for (road_index, road) in topology.roads.iter().enumerate() {
        let Some(cap) = road.max_vehicles else {
            continue;
        };
        let road_id = RoadId(road_index);
        let mut running = Vec::new();
        let mut broken = Vec::new();
        for vehicle in vehicles.values().filter(|v| v.road == road_id) {
            if vehicle.is_broken() {
                broken.push(vehicle.id);
            } else {
                running.push(vehicle.id);
            }
        }
        let population = running.len() + broken.len();
        if population <= cap {
            continue;
        }
        running.shuffle(rng);
        broken.shuffle(rng);
        for id in running.into_iter().chain(broken).take(population - cap) {
            vehicles.remove(&id);
            stats.cap_removals += 1;
            debug!("Removed vehicle {} from road {} over its cap of {}", id.0 .0, road_index, cap);
        }
    }
}
