//! Error types for the traffic simulation

use thiserror::Error;

use super::types::{LaneId, RoadId};

/// Everything the engine can refuse to do.
///
/// Construction and parameter errors are caller mistakes. `InvariantViolation`
/// is a defect in the engine itself: the step that produced it is discarded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("unknown parameter '{0}'")]
    UnknownParam(String),

    #[error("invalid value {value} for parameter '{name}': {reason}")]
    InvalidParam {
        name: String,
        value: f64,
        reason: String,
    },

    #[error("unknown boundary mode '{0}' (expected 'toroid' or 'null')")]
    UnknownBoundaryMode(String),

    #[error("road {} has no lane {}", .road.0, .lane.0)]
    UnknownLane { road: RoadId, lane: LaneId },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

pub type SimResult<T> = Result<T, SimError>;
