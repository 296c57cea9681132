//! Tunable behaviour parameters
//!
//! Every probability and window is a named parameter that can be changed
//! at runtime through [`SimParams::set`] or loaded from JSON.

use serde::{Deserialize, Serialize};

use super::error::{SimError, SimResult};

/// Names accepted by [`SimParams::set`] and [`SimParams::get`]
pub const PARAM_NAMES: [&str; 12] = [
    "breakdown_prob",
    "repair_prob",
    "repair_countdown",
    "lane_change_prob",
    "blocked_lane_change_prob",
    "look_ahead",
    "turn_prob",
    "turn_window",
    "lane_change_window",
    "insertion_prob",
    "insertion_damping",
    "exit_survival_prob",
];

/// Stochastic constants of the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Chance that an Active vehicle whose advance is blocked breaks down
    pub breakdown_prob: f64,
    /// Chance that a vehicle is repaired once its countdown expires (towed otherwise)
    pub repair_prob: f64,
    /// Generations a vehicle stays Broken before the repair roll
    pub repair_countdown: u32,
    /// Baseline lane-change trigger
    pub lane_change_prob: f64,
    /// Lane-change trigger when a Broken vehicle is within `look_ahead`
    pub blocked_lane_change_prob: f64,
    /// Cells scanned ahead for Broken vehicles
    pub look_ahead: u32,
    /// Turn roll for a vehicle on a turn-eligible lane near the intersection
    pub turn_prob: f64,
    /// Generations spent Turning before the turn commits
    pub turn_window: u32,
    /// Generations spent ChangingLane before the switch commits
    pub lane_change_window: u32,
    /// Base chance of inserting a vehicle at a road's entry edge (Null mode)
    pub insertion_prob: f64,
    /// Multiplier on `insertion_prob` per road per generation
    pub insertion_damping: f64,
    /// Null mode: chance an exiting vehicle re-enters at its entry edge
    pub exit_survival_prob: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            breakdown_prob: 0.05,
            repair_prob: 0.5,
            repair_countdown: 20,
            lane_change_prob: 0.2,
            blocked_lane_change_prob: 0.5,
            look_ahead: 3,
            turn_prob: 0.2,
            turn_window: 3,
            lane_change_window: 2,
            insertion_prob: 0.05,
            insertion_damping: 0.3,
            exit_survival_prob: 0.0,
        }
    }
}

impl SimParams {
    /// Parameters with every stochastic event switched off
    pub fn deterministic() -> Self {
        Self {
            breakdown_prob: 0.0,
            lane_change_prob: 0.0,
            blocked_lane_change_prob: 0.0,
            turn_prob: 0.0,
            insertion_prob: 0.0,
            exit_survival_prob: 0.0,
            ..Self::default()
        }
    }

    /// Effective per-road insertion probability
    pub fn effective_insertion_prob(&self) -> f64 {
        self.insertion_prob * self.insertion_damping
    }

    /// Read a parameter by name
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "breakdown_prob" => self.breakdown_prob,
            "repair_prob" => self.repair_prob,
            "repair_countdown" => f64::from(self.repair_countdown),
            "lane_change_prob" => self.lane_change_prob,
            "blocked_lane_change_prob" => self.blocked_lane_change_prob,
            "look_ahead" => f64::from(self.look_ahead),
            "turn_prob" => self.turn_prob,
            "turn_window" => f64::from(self.turn_window),
            "lane_change_window" => f64::from(self.lane_change_window),
            "insertion_prob" => self.insertion_prob,
            "insertion_damping" => self.insertion_damping,
            "exit_survival_prob" => self.exit_survival_prob,
            _ => return None,
        };
        Some(value)
    }

    /// Set a parameter by name, validating its range.
    /// The parameters are left untouched when the value is rejected.
    pub fn set(&mut self, name: &str, value: f64) -> SimResult<()> {
        match name {
            "breakdown_prob" => self.breakdown_prob = probability(name, value)?,
            "repair_prob" => self.repair_prob = probability(name, value)?,
            "repair_countdown" => self.repair_countdown = count(name, value, 0)?,
            "lane_change_prob" => self.lane_change_prob = probability(name, value)?,
            "blocked_lane_change_prob" => {
                self.blocked_lane_change_prob = probability(name, value)?
            }
            "look_ahead" => self.look_ahead = count(name, value, 0)?,
            "turn_prob" => self.turn_prob = probability(name, value)?,
            "turn_window" => self.turn_window = count(name, value, 1)?,
            "lane_change_window" => self.lane_change_window = count(name, value, 1)?,
            "insertion_prob" => self.insertion_prob = probability(name, value)?,
            "insertion_damping" => self.insertion_damping = probability(name, value)?,
            "exit_survival_prob" => self.exit_survival_prob = probability(name, value)?,
            _ => return Err(SimError::UnknownParam(name.to_string())),
        }
        Ok(())
    }

    /// Check every field, e.g. after deserializing a parameter file
    pub fn validate(&self) -> SimResult<()> {
        for name in PARAM_NAMES {
            if let Some(value) = self.get(name) {
                let mut probe = self.clone();
                probe.set(name, value)?;
            }
        }
        Ok(())
    }
}

fn probability(name: &str, value: f64) -> SimResult<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SimError::InvalidParam {
            name: name.to_string(),
            value,
            reason: "probability must lie in [0, 1]".to_string(),
        })
    }
}

fn count(name: &str, value: f64, min: u32) -> SimResult<u32> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(SimError::InvalidParam {
            name: name.to_string(),
            value,
            reason: "expected a whole number".to_string(),
        });
    }
    if value < f64::from(min) || value > f64::from(u32::MAX) {
        return Err(SimError::InvalidParam {
            name: name.to_string(),
            value,
            reason: format!("must be between {} and {}", min, u32::MAX),
        });
    }
    Ok(value as u32)
}
