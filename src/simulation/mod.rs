//! Rule 184 traffic simulation engine
//!
//! Everything needed to advance the simulation lives here, free of any
//! rendering or input handling. A driver builds a [`Simulation`] from a
//! [`Topology`], calls [`Simulation::step`] once per generation and reads
//! lane occupancy and vehicle views back out.

mod breakdown;
mod config;
mod error;
mod intersection;
mod lane;
mod lane_change;
mod road_network;
mod rule;
mod snapshot;
mod stats;
mod topology;
mod types;
mod vehicle;
mod vehicle_manager;
mod world;

// Re-export public types for external use
pub use breakdown::{resolve_repair, should_break_down, RepairOutcome};
pub use config::{SimParams, PARAM_NAMES};
pub use error::{SimError, SimResult};
pub use intersection::SimIntersection;
pub use lane::Lane;
pub use lane_change::{find_lane_change_target, free_neighbour_lanes, lane_change_probability};
pub use road_network::{CellClaims, SimRoadNetwork};
pub use rule::{advance, next_cell, offset_index, pattern, step_lane, Advance, RULE_184};
pub use snapshot::{SimulationSnapshot, SNAPSHOT_VERSION};
pub use stats::SimStats;
pub use topology::{initial_positions, IntersectionSpec, LaneFill, RoadSpec, Topology, TurnRule};
pub use types::{
    BoundaryMode, CellRef, Direction, LaneId, RoadId, SimId, VehicleId, VehicleStatus,
};
pub use vehicle::{SimVehicle, TransitionProgress, VehicleView};
pub use vehicle_manager::{entry_lane, enforce_caps, insert_at_entries, populate, VehicleMap};
pub use world::Simulation;
