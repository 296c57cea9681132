//! Core types for the traffic simulation
//!
//! Identifiers, travel directions and vehicle status shared by every stage
//! of the generation update.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SimError;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimId(pub usize);

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub SimId);

/// Index of a road in the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoadId(pub usize);

/// Index of a lane within its road
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneId(pub usize);

/// A single cell of the road network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub road: RoadId,
    pub lane: LaneId,
    pub position: usize,
}

impl CellRef {
    pub fn new(road: usize, lane: usize, position: usize) -> Self {
        Self {
            road: RoadId(road),
            lane: LaneId(lane),
            position,
        }
    }

    /// Same position on another lane of the same road
    pub fn with_lane(self, lane: LaneId) -> Self {
        Self { lane, ..self }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "road {} lane {} cell {}", self.road.0, self.lane.0, self.position)
    }
}

/// Cardinal travel direction of a road
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// West to east, increasing index
    LeftToRight,
    /// East to west, decreasing index
    RightToLeft,
    /// North to south, increasing index
    TopToBottom,
    /// South to north, decreasing index
    BottomToTop,
}

impl Direction {
    /// Whether travel follows increasing cell index
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::TopToBottom)
    }

    /// Index delta of one cell of travel
    pub fn step(self) -> isize {
        if self.is_forward() {
            1
        } else {
            -1
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::TopToBottom | Direction::BottomToTop)
    }

    /// Glyph used by the text map
    pub fn glyph(self) -> char {
        match self {
            Direction::LeftToRight => '>',
            Direction::RightToLeft => '<',
            Direction::TopToBottom => 'v',
            Direction::BottomToTop => '^',
        }
    }
}

/// Edge handling shared by every lane in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoundaryMode {
    /// Lanes wrap end-to-end and vehicle count is conserved
    #[default]
    Toroid,
    /// Lanes have hard ends: vehicles leave at the far edge and new ones
    /// are inserted at the entry edge
    Null,
}

impl fmt::Display for BoundaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryMode::Toroid => write!(f, "toroid"),
            BoundaryMode::Null => write!(f, "null"),
        }
    }
}

impl FromStr for BoundaryMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toroid" | "torus" | "t" => Ok(BoundaryMode::Toroid),
            "null" | "open" | "n" => Ok(BoundaryMode::Null),
            other => Err(SimError::UnknownBoundaryMode(other.to_string())),
        }
    }
}

/// Behavioural state of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleStatus {
    Active,
    /// Immobile until the repair countdown runs out
    Broken,
    /// Committing to a move onto another road at the intersection
    Turning,
    /// Committing to a move onto a parallel lane
    ChangingLane,
    /// Towed or gone; never present in a committed state
    Removed,
}

impl VehicleStatus {
    /// Glyph used by the text map, `None` for a vehicle drawn by direction
    pub fn glyph(self) -> Option<char> {
        match self {
            VehicleStatus::Active | VehicleStatus::Removed => None,
            VehicleStatus::Broken => Some('X'),
            VehicleStatus::Turning => Some('T'),
            VehicleStatus::ChangingLane => Some('L'),
        }
    }
}
