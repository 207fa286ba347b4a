// Error types for the pathing engine.
//
// Only genuinely exceptional conditions are errors. "No path exists", an
// infeasible transition, an unloaded region or an executor that loses its
// path are ordinary outcomes, reported through `SearchResult` and
// `ExecutorState` instead.
//
// See also: `path.rs` (integrity checks), `config.rs` (loading and
// validation), `goal.rs` (goal construction).

use crate::types::Position;
use thiserror::Error;

/// A path violated one of its structural invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathIntegrityError {
    #[error("path has no positions")]
    Empty,
    #[error("path has {positions} positions but {transitions} transitions")]
    TransitionCountMismatch {
        positions: usize,
        transitions: usize,
    },
    #[error("path has {transitions} transitions but {costs} costs")]
    CostCountMismatch { transitions: usize, costs: usize },
    #[error("path starts at {actual}, expected {expected}")]
    WrongSource {
        expected: Position,
        actual: Position,
    },
    #[error("path ends at {actual}, expected {expected}")]
    WrongDestination {
        expected: Position,
        actual: Position,
    },
    #[error("transition {index} does not connect {from} to {to}")]
    DisconnectedTransition {
        index: usize,
        from: Position,
        to: Position,
    },
    #[error("position {position} appears twice (indices {first} and {second})")]
    Loop {
        position: Position,
        first: usize,
        second: usize,
    },
}

/// A configuration document could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed pathing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: &str) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A goal could not be constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GoalError {
    #[error("composite goal needs at least one sub-goal")]
    EmptyComposite,
    #[error("run-away goal needs at least one point to flee from")]
    NoRunAwayPoints,
    #[error("run-away distance must be positive, got {0}")]
    NonPositiveDistance(f64),
    #[error("near-goal range must be non-negative and finite, got {0}")]
    InvalidRange(f64),
}
