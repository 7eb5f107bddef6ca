//! Error types shared by every evaluator and the simulator.

use thiserror::Error;

/// Result type for value computations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by model construction, evaluation and simulation.
///
/// None of these are retried inside the crate: a malformed model or a
/// non-convergent configuration describes an invalid problem instance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The model, policy or a call argument is malformed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Iterative evaluation hit its iteration bound before meeting the tolerance.
    #[error(
        "value iteration did not converge after {iterations} iterations (last delta {delta:e})"
    )]
    Convergence { iterations: usize, delta: f64 },

    /// `(I - gamma * P)` could not be factorised with acceptable conditioning.
    #[error("linear system is singular or ill-conditioned (pivot {pivot:e} at row {row})")]
    SingularSystem { row: usize, pivot: f64 },

    /// Exact and iterative evaluation produced different fixed points.
    #[error("exact and iterative values differ by {difference:e}, tolerance is {tolerance:e}")]
    Disagreement { difference: f64, tolerance: f64 },
}

/// The ways a model, policy or argument can be malformed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("state set is empty")]
    EmptyStateSet,

    #[error("action set is empty")]
    EmptyActionSet,

    #[error("duplicate label {0:?}")]
    DuplicateLabel(String),

    #[error("{what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("{what} row {row} has invalid probability {value}")]
    InvalidProbability {
        what: &'static str,
        row: String,
        value: f64,
    },

    #[error("{what} row {row} sums to {sum}, expected 1")]
    RowNotStochastic {
        what: &'static str,
        row: String,
        sum: f64,
    },

    #[error("discount factor {0} is outside [0, 1)")]
    DiscountOutOfRange(f64),

    #[error("reward {value} at {at} is not finite")]
    NonFiniteReward { at: String, value: f64 },

    #[error("state index {index} is out of range for {num_states} states")]
    StateOutOfRange { index: usize, num_states: usize },

    #[error("action index {index} is out of range for {num_actions} actions")]
    ActionOutOfRange { index: usize, num_actions: usize },

    #[error("tolerance {0} must be finite and positive")]
    InvalidTolerance(f64),

    #[error("at least one episode is required")]
    NoEpisodes,
}
