//! Breakdown and repair lifecycle

use rand::Rng;

use super::vehicle::SimVehicle;

/// What happens to a Broken vehicle this generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Countdown still running
    Pending,
    /// Back to Active in the same cell
    Repaired,
    /// Removed from the road
    Towed,
}

/// Tick the repair countdown and roll for repair once it reaches zero
pub fn resolve_repair(vehicle: &mut SimVehicle, repair_prob: f64, rng: &mut impl Rng) -> RepairOutcome {
    if !vehicle.is_broken() {
        return RepairOutcome::Pending;
    }
    vehicle.repair_countdown = vehicle.repair_countdown.saturating_sub(1);
    if vehicle.repair_countdown > 0 {
        return RepairOutcome::Pending;
    }
    if rng.random_bool(repair_prob) {
        vehicle.repair();
        RepairOutcome::Repaired
    } else {
        RepairOutcome::Towed
    }
}

/// Roll for a breakdown of a vehicle whose advance is blocked
pub fn should_break_down(breakdown_prob: f64, rng: &mut impl Rng) -> bool {
    breakdown_prob > 0.0 && rng.random_bool(breakdown_prob)
}
