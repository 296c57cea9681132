//! Main simulation world that ties everything together
//!
//! [`Simulation`] owns the topology, the parameters and the vehicle list,
//! and advances them one generation at a time. A generation runs on a
//! working copy of the state that replaces the current one only when every
//! phase succeeded, so a rejected step leaves nothing behind.

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use super::breakdown::{resolve_repair, should_break_down, RepairOutcome};
use super::config::SimParams;
use super::error::{SimError, SimResult};
use super::intersection::SimIntersection;
use super::lane_change::find_lane_change_target;
use super::road_network::{CellClaims, SimRoadNetwork};
use super::rule::{self, Advance};
use super::snapshot::{SimulationSnapshot, SNAPSHOT_VERSION};
use super::stats::SimStats;
use super::topology::Topology;
use super::types::{BoundaryMode, CellRef, LaneId, RoadId, VehicleId, VehicleStatus};
use super::vehicle::{SimVehicle, TransitionProgress, VehicleView};
use super::vehicle_manager::{self, VehicleMap};

/// What a vehicle does in the commit phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    /// Keeps its cell
    Stay,
    /// Advances along its lane
    Move(CellRef),
    /// Leaves through the far edge (Null mode)
    Exit,
    /// Completes a turn or lane change onto this cell, if it is still free
    Commit(CellRef),
}

/// State that a generation rewrites
#[derive(Debug, Clone)]
struct WorldState {
    vehicles: VehicleMap,
    next_id: usize,
    generation: u64,
    stats: SimStats,
    rng: StdRng,
}

/// The main simulation world
#[derive(Debug, Clone)]
pub struct Simulation {
    topology: Topology,
    params: SimParams,
    boundary: BoundaryMode,
    intersection: Option<SimIntersection>,
    paused: bool,
    state: WorldState,
}

impl Simulation {
    /// Build a simulation with default parameters.
    ///
    /// With a seed every run is reproducible; without one the random stream
    /// is seeded from the operating system.
    pub fn new(topology: Topology, boundary: BoundaryMode, seed: Option<u64>) -> SimResult<Self> {
        Self::with_params(topology, boundary, SimParams::default(), seed)
    }

    pub fn with_params(
        topology: Topology,
        boundary: BoundaryMode,
        params: SimParams,
        seed: Option<u64>,
    ) -> SimResult<Self> {
        topology.validate()?;
        params.validate()?;
        let mut rng = make_rng(seed);
        let mut next_id = 0;
        let vehicles = vehicle_manager::populate(&topology, &mut rng, &mut next_id)?;
        let intersection = build_intersection(&topology);
        Ok(Self {
            topology,
            params,
            boundary,
            intersection,
            paused: false,
            state: WorldState {
                vehicles,
                next_id,
                generation: 0,
                stats: SimStats::default(),
                rng,
            },
        })
    }

    /// Rebuild a simulation from a snapshot
    pub fn restore(snapshot: SimulationSnapshot, seed: Option<u64>) -> SimResult<Self> {
        snapshot.validate()?;
        let intersection = build_intersection(&snapshot.topology);
        let vehicles = snapshot
            .vehicles
            .into_iter()
            .map(|v| (v.id, v))
            .collect();
        Ok(Self {
            topology: snapshot.topology,
            params: snapshot.params,
            boundary: snapshot.boundary_mode,
            intersection,
            paused: snapshot.paused,
            state: WorldState {
                vehicles,
                next_id: snapshot.next_id,
                generation: snapshot.generation,
                stats: snapshot.stats,
                rng: make_rng(seed),
            },
        })
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            version: SNAPSHOT_VERSION,
            topology: self.topology.clone(),
            params: self.params.clone(),
            boundary_mode: self.boundary,
            generation: self.state.generation,
            next_id: self.state.next_id,
            paused: self.paused,
            stats: self.state.stats.clone(),
            vehicles: self.state.vehicles.values().cloned().collect(),
        }
    }

    /// Replace the random stream
    pub fn reseed(&mut self, seed: u64) {
        self.state.rng = StdRng::seed_from_u64(seed);
    }

    /// Advance one generation.
    ///
    /// Does nothing while paused. On an invariant violation the error is
    /// returned and the previous state, random stream included, is kept.
    pub fn step(&mut self) -> SimResult<()> {
        if self.paused {
            return Ok(());
        }
        let mut next = self.state.clone();
        match self.run_generation(&mut next) {
            Ok(()) => {
                self.state = next;
                Ok(())
            }
            Err(e) => {
                error!(
                    "Generation {} rejected, keeping previous state: {}",
                    self.state.generation + 1,
                    e
                );
                Err(e)
            }
        }
    }

    fn run_generation(&self, state: &mut WorldState) -> SimResult<()> {
        let settled = self.resolve_repairs(state);

        let network = SimRoadNetwork::build(&self.topology, state.vehicles.values())?;
        let advances = self.tentative_advances(state, &network, &settled);

        let plans = self.decide(state, &network, &advances, &settled);
        self.commit(state, &plans)?;

        if self.boundary == BoundaryMode::Null {
            vehicle_manager::insert_at_entries(
                &mut state.vehicles,
                &self.topology,
                &self.params,
                &mut state.rng,
                &mut state.next_id,
                &mut state.stats,
            )?;
        }
        vehicle_manager::enforce_caps(
            &mut state.vehicles,
            &self.topology,
            &mut state.rng,
            &mut state.stats,
        );

        SimRoadNetwork::build(&self.topology, state.vehicles.values())?;
        state.generation += 1;
        Ok(())
    }

    /// Tick every repair countdown. Returns the vehicles repaired this
    /// generation, which keep their cell until the next one.
    fn resolve_repairs(&self, state: &mut WorldState) -> HashSet<VehicleId> {
        let mut settled = HashSet::new();
        let broken: Vec<VehicleId> = state
            .vehicles
            .values()
            .filter(|v| v.is_broken())
            .map(|v| v.id)
            .collect();
        for id in broken {
            let Some(vehicle) = state.vehicles.get_mut(&id) else {
                continue;
            };
            match resolve_repair(vehicle, self.params.repair_prob, &mut state.rng) {
                RepairOutcome::Pending => {}
                RepairOutcome::Repaired => {
                    debug!("Vehicle {} repaired at {}", id.0 .0, vehicle.cell());
                    state.stats.repairs += 1;
                    settled.insert(id);
                }
                RepairOutcome::Towed => {
                    debug!("Vehicle {} towed from {}", id.0 .0, vehicle.cell());
                    state.vehicles.remove(&id);
                    state.stats.tows += 1;
                }
            }
        }
        settled
    }

    /// Rule 184 outcome for every Active vehicle free to move
    fn tentative_advances(
        &self,
        state: &WorldState,
        network: &SimRoadNetwork,
        settled: &HashSet<VehicleId>,
    ) -> HashMap<VehicleId, Advance> {
        let occupancy: Vec<Vec<Vec<bool>>> = (0..network.road_count())
            .map(|road| {
                network
                    .lanes(RoadId(road))
                    .iter()
                    .map(|lane| lane.occupancy())
                    .collect()
            })
            .collect();

        state
            .vehicles
            .values()
            .filter(|v| v.is_active() && !settled.contains(&v.id))
            .filter_map(|v| {
                let cells = occupancy.get(v.road.0)?.get(v.lane.0)?;
                Some((v.id, rule::advance(cells, v.position, v.direction, self.boundary)))
            })
            .collect()
    }

    /// Decide every vehicle's move in a shuffled order, reading only the
    /// start-of-generation network
    fn decide(
        &self,
        state: &mut WorldState,
        network: &SimRoadNetwork,
        advances: &HashMap<VehicleId, Advance>,
        settled: &HashSet<VehicleId>,
    ) -> Vec<(VehicleId, Plan)> {
        let mut order: Vec<VehicleId> = state.vehicles.keys().copied().collect();
        order.shuffle(&mut state.rng);

        let mut plans = Vec::with_capacity(order.len());
        for id in order {
            let Some(vehicle) = state.vehicles.get_mut(&id) else {
                continue;
            };
            let plan = match vehicle.status {
                VehicleStatus::Turning => {
                    transition_plan(vehicle.advance_transition(self.params.turn_window))
                }
                VehicleStatus::ChangingLane => {
                    transition_plan(vehicle.advance_transition(self.params.lane_change_window))
                }
                VehicleStatus::Active if !settled.contains(&id) => {
                    let advance = advances.get(&id).copied().unwrap_or(Advance::Blocked);
                    self.decide_active(vehicle, network, advance, &mut state.rng, &mut state.stats)
                }
                _ => Plan::Stay,
            };
            plans.push((id, plan));
        }
        plans
    }

    /// Turn first, then lane change, then plain Rule 184 movement
    fn decide_active(
        &self,
        vehicle: &mut SimVehicle,
        network: &SimRoadNetwork,
        advance: Advance,
        rng: &mut StdRng,
        stats: &mut SimStats,
    ) -> Plan {
        let near_intersection = self
            .intersection
            .as_ref()
            .is_some_and(|i| i.is_near(vehicle.road, vehicle.position));

        if near_intersection {
            let target = self
                .intersection
                .as_ref()
                .and_then(|i| i.try_begin_turn(vehicle, network, self.params.turn_prob, rng));
            if let Some(target) = target {
                debug!("Vehicle {} starts turning from {} to {}", vehicle.id.0 .0, vehicle.cell(), target);
                vehicle.begin_turn(target);
                return Plan::Stay;
            }
        } else if let Some(target) =
            find_lane_change_target(vehicle, network, &self.params, self.boundary, rng)
        {
            debug!("Vehicle {} starts changing lane from {} to {}", vehicle.id.0 .0, vehicle.cell(), target);
            vehicle.begin_lane_change(target);
            return Plan::Stay;
        }

        match advance {
            Advance::Moved(position) => Plan::Move(CellRef {
                position,
                ..vehicle.cell()
            }),
            Advance::Exited => Plan::Exit,
            Advance::Blocked => {
                if should_break_down(self.params.breakdown_prob, rng) {
                    debug!("Vehicle {} broke down at {}", vehicle.id.0 .0, vehicle.cell());
                    vehicle.break_down(self.params.repair_countdown);
                    stats.breakdowns += 1;
                }
                Plan::Stay
            }
        }
    }

    /// Apply every plan. Vehicles keeping their cell claim it first, then
    /// movers, then completing turns and lane changes in decision order.
    fn commit(&self, state: &mut WorldState, plans: &[(VehicleId, Plan)]) -> SimResult<()> {
        let mut claims = CellClaims::new();

        for (id, plan) in plans {
            if matches!(plan, Plan::Stay | Plan::Commit(_)) {
                let cell = vehicle_cell(&state.vehicles, *id)?;
                claim(&mut claims, cell, *id)?;
            }
        }

        for (id, plan) in plans {
            if let Plan::Move(cell) = plan {
                claim(&mut claims, *cell, *id)?;
                if let Some(vehicle) = state.vehicles.get_mut(id) {
                    vehicle.position = cell.position;
                }
            }
        }

        for (id, plan) in plans {
            if let Plan::Commit(target) = plan {
                self.commit_transition(state, &mut claims, *id, *target);
            }
        }

        for (id, plan) in plans {
            if *plan == Plan::Exit {
                self.exit_vehicle(state, &mut claims, *id);
            }
        }
        Ok(())
    }

    fn commit_transition(
        &self,
        state: &mut WorldState,
        claims: &mut CellClaims,
        id: VehicleId,
        target: CellRef,
    ) {
        let Some(vehicle) = state.vehicles.get_mut(&id) else {
            return;
        };
        let turning = vehicle.status == VehicleStatus::Turning;
        let origin = vehicle.cell();
        let direction = self
            .topology
            .road(target.road)
            .filter(|r| target.lane.0 < r.lanes.len() && target.position < r.length)
            .map(|r| r.direction);

        match direction {
            Some(direction) if target != origin && claims.claim(target, id) => {
                claims.release(origin, id);
                vehicle.relocate(target, direction);
                if turning {
                    state.stats.turns += 1;
                    debug!("Vehicle {} turned from {} to {}", id.0 .0, origin, target);
                } else {
                    state.stats.lane_changes += 1;
                    debug!("Vehicle {} changed lane from {} to {}", id.0 .0, origin, target);
                }
            }
            _ => {
                vehicle.revert();
                if turning {
                    state.stats.aborted_turns += 1;
                    debug!("Vehicle {} aborted its turn at {}: {} is taken", id.0 .0, origin, target);
                } else {
                    state.stats.aborted_lane_changes += 1;
                    debug!("Vehicle {} aborted its lane change at {}: {} is taken", id.0 .0, origin, target);
                }
            }
        }
    }

    /// Remove a vehicle that drove off the far edge, or bring it back at the
    /// entry edge when it survives the exit roll and that cell is free
    fn exit_vehicle(&self, state: &mut WorldState, claims: &mut CellClaims, id: VehicleId) {
        let Some(mut vehicle) = state.vehicles.remove(&id) else {
            return;
        };
        state.stats.exits += 1;

        let survives = self.params.exit_survival_prob > 0.0
            && state.rng.random_bool(self.params.exit_survival_prob);
        if survives {
            if let Some(road) = self.topology.road(vehicle.road) {
                let entry = CellRef {
                    position: road.entry_index(),
                    ..vehicle.cell()
                };
                if claims.claim(entry, id) {
                    vehicle.position = entry.position;
                    debug!("Vehicle {} re-entered at {}", id.0 .0, entry);
                    state.stats.reentries += 1;
                    state.vehicles.insert(id, vehicle);
                    return;
                }
            }
        }
        debug!("Vehicle {} exited from {}", id.0 .0, vehicle.cell());
    }

    /// Rebuild the initial population from the topology.
    ///
    /// The random stream continues, so a reset simulation does not replay its
    /// first run. Mode, parameters and the pause flag are kept.
    pub fn reset(&mut self) -> SimResult<()> {
        let mut next_id = 0;
        let vehicles = vehicle_manager::populate(&self.topology, &mut self.state.rng, &mut next_id)?;
        self.state.vehicles = vehicles;
        self.state.next_id = next_id;
        self.state.generation = 0;
        self.state.stats = SimStats::default();
        info!("Simulation reset: {} vehicles", self.state.vehicles.len());
        Ok(())
    }

    /// Switch edge handling; takes effect on the next step
    pub fn set_boundary_mode(&mut self, mode: BoundaryMode) {
        if mode != self.boundary {
            info!("Boundary mode changed from {} to {}", self.boundary, mode);
        }
        self.boundary = mode;
    }

    pub fn boundary_mode(&self) -> BoundaryMode {
        self.boundary
    }

    /// Change one tunable parameter by name
    pub fn set_param(&mut self, name: &str, value: f64) -> SimResult<()> {
        self.params.set(name, value)?;
        debug!("Parameter {} set to {}", name, value);
        Ok(())
    }

    /// Replace every parameter at once
    pub fn set_params(&mut self, params: SimParams) -> SimResult<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused {
            info!("Simulation {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    pub fn turn_count(&self) -> u64 {
        self.state.stats.turns
    }

    pub fn stats(&self) -> &SimStats {
        &self.state.stats
    }

    /// Occupancy of one lane, derived from vehicle positions
    pub fn lane_occupancy(&self, road: RoadId, lane: LaneId) -> SimResult<Vec<bool>> {
        let spec = self
            .topology
            .road(road)
            .filter(|r| lane.0 < r.lanes.len())
            .ok_or(SimError::UnknownLane { road, lane })?;
        let mut cells = vec![false; spec.length];
        for vehicle in self
            .state
            .vehicles
            .values()
            .filter(|v| v.road == road && v.lane == lane)
        {
            if let Some(cell) = cells.get_mut(vehicle.position) {
                *cell = true;
            }
        }
        Ok(cells)
    }

    /// Every vehicle on the road, ordered by id
    pub fn vehicles(&self) -> Vec<VehicleView> {
        self.state.vehicles.values().map(SimVehicle::view).collect()
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<VehicleView> {
        self.state.vehicles.get(&id).map(SimVehicle::view)
    }

    pub fn vehicle_count(&self) -> usize {
        self.state.vehicles.len()
    }

    /// Vehicles on one road, all lanes together
    pub fn road_population(&self, road: RoadId) -> usize {
        self.state.vehicles.values().filter(|v| v.road == road).count()
    }

    /// Short multi-line report of the current state
    pub fn summary(&self) -> String {
        let count = |status: VehicleStatus| {
            self.state
                .vehicles
                .values()
                .filter(|v| v.status == status)
                .count()
        };
        let mut out = String::new();
        let _ = writeln!(out, "=== Traffic Simulation Summary ===");
        let _ = writeln!(
            out,
            "Generation: {} ({} boundary{})",
            self.state.generation,
            self.boundary,
            if self.paused { ", paused" } else { "" }
        );
        let _ = writeln!(
            out,
            "Vehicles: {} (active {}, broken {}, turning {}, changing lane {})",
            self.state.vehicles.len(),
            count(VehicleStatus::Active),
            count(VehicleStatus::Broken),
            count(VehicleStatus::Turning),
            count(VehicleStatus::ChangingLane)
        );
        let _ = writeln!(out, "--- Roads ---");
        for (index, road) in self.topology.roads.iter().enumerate() {
            let population = self.road_population(RoadId(index));
            match road.max_vehicles {
                Some(cap) => {
                    let _ = writeln!(
                        out,
                        "  Road {} '{}' {}: {}/{} vehicles",
                        index,
                        road.name,
                        road.direction.glyph(),
                        population,
                        cap
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "  Road {} '{}' {}: {} vehicles",
                        index,
                        road.name,
                        road.direction.glyph(),
                        population
                    );
                }
            }
        }
        let _ = writeln!(out, "--- Statistics ---");
        let _ = writeln!(out, "  {}", self.state.stats);
        out
    }

    /// One text row per lane.
    ///
    /// `.` is an empty cell, `X` Broken, `T` Turning, `L` ChangingLane and
    /// an arrow an Active vehicle pointing along its road. Intersection
    /// centres are marked with `+` when empty.
    pub fn render_map(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Road Map (generation {}) ===", self.state.generation);
        for (road_index, road) in self.topology.roads.iter().enumerate() {
            let road_id = RoadId(road_index);
            let center = self.intersection.as_ref().and_then(|i| i.center(road_id));
            for lane_index in 0..road.lanes.len() {
                let mut row: Vec<char> = (0..road.length)
                    .map(|i| if Some(i) == center { '+' } else { '.' })
                    .collect();
                for vehicle in self
                    .state
                    .vehicles
                    .values()
                    .filter(|v| v.road == road_id && v.lane.0 == lane_index)
                {
                    if let Some(cell) = row.get_mut(vehicle.position) {
                        *cell = vehicle
                            .status
                            .glyph()
                            .unwrap_or_else(|| vehicle.direction.glyph());
                    }
                }
                let row: String = row.into_iter().collect();
                let _ = writeln!(out, "{:>2}.{} {:<12} |{}|", road_index, lane_index, road.name, row);
            }
        }
        out
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn build_intersection(topology: &Topology) -> Option<SimIntersection> {
    topology
        .intersection
        .as_ref()
        .map(|spec| SimIntersection::new(spec, topology))
}

fn transition_plan(progress: TransitionProgress) -> Plan {
    match progress {
        TransitionProgress::InProgress => Plan::Stay,
        TransitionProgress::Ready(target) => Plan::Commit(target),
    }
}

fn vehicle_cell(vehicles: &VehicleMap, id: VehicleId) -> SimResult<CellRef> {
    vehicles
        .get(&id)
        .map(SimVehicle::cell)
        .ok_or_else(|| SimError::InvariantViolation(format!("vehicle {} vanished mid-generation", id.0 .0)))
}

fn claim(claims: &mut CellClaims, cell: CellRef, id: VehicleId) -> SimResult<()> {
    if claims.claim(cell, id) {
        Ok(())
    } else {
        Err(SimError::InvariantViolation(format!(
            "vehicle {} cannot take {}: already claimed",
            id.0 .0, cell
        )))
    }
}
