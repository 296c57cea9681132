//! Vehicle identity and behavioural state machine
//!
//! A vehicle owns its cell. Lane occupancy is derived from the vehicle list
//! every generation and never stored on its own.

use serde::{Deserialize, Serialize};

use super::types::{CellRef, Direction, LaneId, RoadId, VehicleId, VehicleStatus};

/// Result of advancing a Turning or ChangingLane vehicle by one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionProgress {
    /// Still inside the commit window
    InProgress,
    /// Window complete, the move to this cell should be attempted now
    Ready(CellRef),
}

/// A vehicle in the traffic simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub road: RoadId,
    pub lane: LaneId,
    pub position: usize,
    pub direction: Direction,
    pub status: VehicleStatus,
    /// Generations left before the repair roll; only meaningful while Broken
    pub repair_countdown: u32,
    /// Destination of a pending turn or lane change
    pub target: Option<CellRef>,
    /// Road the vehicle first appeared on, kept across turns
    pub origin_road: RoadId,
    /// Generations spent in the current Turning/ChangingLane window
    pub progress: u32,
    /// Number of turns this vehicle has completed
    #[serde(default)]
    pub turns: u32,
}

impl SimVehicle {
    pub fn new(id: VehicleId, cell: CellRef, direction: Direction) -> Self {
        Self {
            id,
            road: cell.road,
            lane: cell.lane,
            position: cell.position,
            direction,
            status: VehicleStatus::Active,
            repair_countdown: 0,
            target: None,
            origin_road: cell.road,
            progress: 0,
            turns: 0,
        }
    }

    pub fn cell(&self) -> CellRef {
        CellRef {
            road: self.road,
            lane: self.lane,
            position: self.position,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == VehicleStatus::Active
    }

    pub fn is_broken(&self) -> bool {
        self.status == VehicleStatus::Broken
    }

    /// Whether the vehicle is mid-way through a turn or lane change
    pub fn in_transition(&self) -> bool {
        matches!(
            self.status,
            VehicleStatus::Turning | VehicleStatus::ChangingLane
        )
    }

    pub fn begin_turn(&mut self, target: CellRef) {
        self.start_transition(VehicleStatus::Turning, target);
    }

    pub fn begin_lane_change(&mut self, target: CellRef) {
        self.start_transition(VehicleStatus::ChangingLane, target);
    }

    fn start_transition(&mut self, status: VehicleStatus, target: CellRef) {
        debug_assert!(self.is_active());
        self.status = status;
        self.target = Some(target);
        self.progress = 0;
    }

    pub fn break_down(&mut self, countdown: u32) {
        self.status = VehicleStatus::Broken;
        self.repair_countdown = countdown;
        self.target = None;
        self.progress = 0;
    }

    /// Count one generation of the commit window
    pub fn advance_transition(&mut self, window: u32) -> TransitionProgress {
        self.progress = self.progress.saturating_add(1);
        match self.target {
            Some(target) if self.progress >= window => TransitionProgress::Ready(target),
            Some(_) => TransitionProgress::InProgress,
            // A transition without a target cannot complete; treat it as due
            // so the commit stage reverts it
            None => TransitionProgress::Ready(self.cell()),
        }
    }

    /// Move to a committed destination and become Active again
    pub fn relocate(&mut self, target: CellRef, direction: Direction) {
        if target.road != self.road {
            self.turns += 1;
        }
        self.road = target.road;
        self.lane = target.lane;
        self.position = target.position;
        self.direction = direction;
        self.clear_transition();
    }

    /// Abandon a pending transition without moving
    pub fn revert(&mut self) {
        self.clear_transition();
    }

    pub fn repair(&mut self) {
        self.status = VehicleStatus::Active;
        self.repair_countdown = 0;
    }

    fn clear_transition(&mut self) {
        self.status = VehicleStatus::Active;
        self.target = None;
        self.progress = 0;
    }

    pub fn view(&self) -> VehicleView {
        VehicleView {
            id: self.id,
            road: self.road,
            lane: self.lane,
            position: self.position,
            direction: self.direction,
            status: self.status,
            origin_road: self.origin_road,
        }
    }
}

/// Read-only view of a vehicle handed to renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleView {
    pub id: VehicleId,
    pub road: RoadId,
    pub lane: LaneId,
    pub position: usize,
    pub direction: Direction,
    pub status: VehicleStatus,
    pub origin_road: RoadId,
}
