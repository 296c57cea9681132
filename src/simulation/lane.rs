//! A single lane of fixed length.
//!
//! Lanes are never the source of truth: they are rebuilt from the vehicle
//! list, so a cell can only be filled through [`Lane::place`], which refuses
//! to put a second vehicle in a cell.

use super::error::{SimError, SimResult};
use super::types::VehicleId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    cells: Vec<Option<VehicleId>>,
}

impl Lane {
    pub fn new(length: usize) -> Self {
        Self {
            cells: vec![None; length],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Vehicle in a cell, `None` when empty or out of range
    pub fn get(&self, index: usize) -> Option<VehicleId> {
        self.cells.get(index).copied().flatten()
    }

    /// Whether a cell exists and holds no vehicle
    pub fn is_free(&self, index: usize) -> bool {
        matches!(self.cells.get(index), Some(None))
    }

    /// Number of occupied cells
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn occupancy(&self) -> Vec<bool> {
        self.cells.iter().map(Option::is_some).collect()
    }

    /// Occupied cells in index order
    pub fn vehicles(&self) -> impl Iterator<Item = (usize, VehicleId)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|id| (i, id)))
    }

    /// Put a vehicle in an empty cell
    pub fn place(&mut self, index: usize, id: VehicleId) -> SimResult<()> {
        let length = self.cells.len();
        let Some(slot) = self.cells.get_mut(index) else {
            return Err(SimError::InvariantViolation(format!(
                "vehicle {} placed at cell {} of a lane of length {}",
                id.0 .0, index, length
            )));
        };
        match *slot {
            None => {
                *slot = Some(id);
                Ok(())
            }
            Some(other) => Err(SimError::InvariantViolation(format!(
                "vehicles {} and {} both occupy cell {}",
                other.0 .0, id.0 .0, index
            ))),
        }
    }
}
