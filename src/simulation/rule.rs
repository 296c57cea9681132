//! Rule 184 cellular automaton
//!
//! The neighbourhood is always read in the frame of travel: `behind`,
//! `center`, `ahead`. For a lane running against increasing index this is
//! the same as reversing the array, applying the canonical rule and
//! reversing back.

use super::types::{BoundaryMode, Direction};

/// Rule 184 indexed by `(behind << 2) | (center << 1) | ahead`.
///
/// An occupied cell keeps its vehicle only when the cell ahead is occupied;
/// an empty cell fills only when the vehicle behind it can advance.
pub const RULE_184: [bool; 8] = [false, false, false, true, true, true, false, true];

/// Pack a neighbourhood into a table index
pub fn pattern(behind: bool, center: bool, ahead: bool) -> usize {
    (usize::from(behind) << 2) | (usize::from(center) << 1) | usize::from(ahead)
}

/// Next state of a cell given its neighbourhood in the frame of travel
pub fn next_cell(behind: bool, center: bool, ahead: bool) -> bool {
    RULE_184[pattern(behind, center, ahead)]
}

/// Index `delta` cells away from `index`.
///
/// Toroid lanes wrap modulo `len`; on Null lanes anything past either edge
/// does not exist.
pub fn offset_index(index: usize, delta: isize, len: usize, boundary: BoundaryMode) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let target = index as isize + delta;
    if (0..len as isize).contains(&target) {
        return Some(target as usize);
    }
    match boundary {
        BoundaryMode::Toroid => Some(target.rem_euclid(len as isize) as usize),
        BoundaryMode::Null => None,
    }
}

/// Occupancy of the cell `delta` steps away, empty when it does not exist
fn occupied_at(cells: &[bool], index: usize, delta: isize, boundary: BoundaryMode) -> bool {
    offset_index(index, delta, cells.len(), boundary).is_some_and(|i| cells[i])
}

/// Apply one generation of Rule 184 to a whole lane.
///
/// In Toroid mode the number of occupied cells is conserved; in Null mode a
/// vehicle on the exit edge leaves and nothing enters at the entry edge.
pub fn step_lane(cells: &[bool], direction: Direction, boundary: BoundaryMode) -> Vec<bool> {
    let step = direction.step();
    (0..cells.len())
        .map(|i| {
            next_cell(
                occupied_at(cells, i, -step, boundary),
                cells[i],
                occupied_at(cells, i, step, boundary),
            )
        })
        .collect()
}

/// What the rule does with the vehicle in one occupied cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The cell ahead is occupied
    Blocked,
    /// The vehicle moves into this cell
    Moved(usize),
    /// Null mode only: the vehicle drives off the end of the lane
    Exited,
}

/// Decide the fate of the vehicle at `index`.
///
/// Every occupied cell counts as an obstacle, whatever the state of the
/// vehicle in it; the caller decides separately whether this vehicle is
/// allowed to move at all.
pub fn advance(cells: &[bool], index: usize, direction: Direction, boundary: BoundaryMode) -> Advance {
    let step = direction.step();
    let stays = next_cell(
        occupied_at(cells, index, -step, boundary),
        true,
        occupied_at(cells, index, step, boundary),
    );
    if stays {
        return Advance::Blocked;
    }
    match offset_index(index, step, cells.len(), boundary) {
        Some(next) => Advance::Moved(next),
        None => Advance::Exited,
    }
}
