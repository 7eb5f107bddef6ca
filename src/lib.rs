//! Long-run discounted value of finite Markov reward and decision processes.
//!
//! See [`mdp`] for the model types, the exact and iterative evaluators, and the
//! trajectory simulator.

pub mod error;
pub mod mdp;

pub use error::{Error, Result, ValidationError};
pub use mdp::{
    collapse, cross_check, estimate_value, exact_evaluate, iterative_evaluate, simulate,
    EvaluationConfig, MarkovDecisionProcess, MarkovRewardProcess, Policy, SimulationConfig,
};
