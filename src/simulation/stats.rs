//! Running counters of simulation events

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Totals since construction or the last reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimStats {
    pub turns: u64,
    pub aborted_turns: u64,
    pub lane_changes: u64,
    pub aborted_lane_changes: u64,
    pub breakdowns: u64,
    pub repairs: u64,
    pub tows: u64,
    pub exits: u64,
    pub reentries: u64,
    pub insertions: u64,
    pub cap_removals: u64,
}

impl SimStats {
    /// Write the totals to the log, one counter per line
    pub fn log_summary(&self, generation: u64, vehicles: usize) {
        info!("Generations: {}", generation);
        info!("Vehicles on road: {}", vehicles);
        info!("Turns completed: {}", self.turns);
        info!("Turns aborted: {}", self.aborted_turns);
        info!("Lane changes: {}", self.lane_changes);
        info!("Lane changes aborted: {}", self.aborted_lane_changes);
        info!("Breakdowns: {}", self.breakdowns);
        info!("Repairs: {}", self.repairs);
        info!("Tows: {}", self.tows);
        info!("Exits: {}", self.exits);
        info!("Re-entries: {}", self.reentries);
        info!("Insertions: {}", self.insertions);
        info!("Cap removals: {}", self.cap_removals);
    }
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "turns={} (aborted {}), lane changes={} (aborted {}), breakdowns={}, repairs={}, tows={}, exits={}, re-entries={}, insertions={}, cap removals={}",
            self.turns,
            self.aborted_turns,
            self.lane_changes,
            self.aborted_lane_changes,
            self.breakdowns,
            self.repairs,
            self.tows,
            self.exits,
            self.reentries,
            self.insertions,
            self.cap_removals
        )
    }
}
