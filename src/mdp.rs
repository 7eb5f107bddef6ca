//! Value computation for finite Markov reward and decision processes.
//!
//! The pipeline is:
//! - build a [`MarkovRewardProcess`] directly, or a [`MarkovDecisionProcess`]
//!   plus a stochastic [`Policy`] and [`collapse`] them into the induced MRP
//! - solve `V = R + gamma * P * V` with [`exact::evaluate`] or
//!   [`iterative::evaluate`]; the two must agree, see [`iterative::cross_check`]
//! - independently, walk the model with [`simulation::simulate`] to collect a
//!   discounted return
//!
//! Models and policies are immutable once built, so any number of evaluations
//! and simulations may share one instance across threads.

pub mod exact;
pub mod iterative;
pub mod linalg;
pub mod model;
pub mod monte_carlo;
pub mod policy;
pub mod simulation;

use crate::error::{Result, ValidationError};

pub use exact::evaluate as exact_evaluate;
pub use iterative::{cross_check, evaluate as iterative_evaluate, history, Evaluation};
pub use model::{MarkovDecisionProcess, MarkovRewardProcess, Rewards};
pub use monte_carlo::{estimate_value, Estimate};
pub use policy::{collapse, Policy};
pub use simulation::{simulate, PolicyWalk, RewardWalk, Step, Trajectory, Walk, Walker};

/// Allowed deviation of a probability row sum from 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Default max-absolute difference accepted between exact and iterative values.
pub const AGREEMENT_TOLERANCE: f64 = 1e-5;

/// Largest pivot ratio the exact solver accepts before calling a system singular.
pub const MAX_CONDITION_ESTIMATE: f64 = 1e12;

/// Configuration for iterative evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    /// Stop once `max_s |V_{k+1}[s] - V_k[s]|` falls below this
    pub tolerance: f64,
    /// Maximum number of Bellman backups
    pub max_iterations: usize,
    /// Keep every iterate, starting with the zero vector
    pub record_history: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 1000,
            record_history: false,
        }
    }
}

impl EvaluationConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ValidationError::InvalidTolerance(self.tolerance).into());
        }
        Ok(())
    }
}

/// Configuration for trajectory simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Index of the state the walk starts in
    pub start_state: usize,
    /// Number of steps to record
    pub steps: usize,
    /// Seed for the walk's random number generator
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_state: 0,
            steps: 15,
            seed: 42,
        }
    }
}

/// Largest absolute element-wise difference between two value vectors.
///
/// Returns infinity when the lengths differ.
pub fn max_abs_difference(a: &ndarray::Array1<f64>, b: &ndarray::Array1<f64>) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_default_configs_match_reference_demo() {
        let eval = EvaluationConfig::default();
        assert_eq!(eval.tolerance, 1e-6);
        assert_eq!(eval.max_iterations, 1000);
        assert!(!eval.record_history);

        let sim = SimulationConfig::default();
        assert_eq!(sim.start_state, 0);
        assert_eq!(sim.seed, 42);
    }

    #[test]
    fn test_invalid_tolerance_is_rejected() {
        for tolerance in [0.0, -1e-6, f64::NAN, f64::INFINITY] {
            let config = EvaluationConfig {
                tolerance,
                ..EvaluationConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_max_abs_difference() {
        assert_eq!(max_abs_difference(&array![1.0, 2.0], &array![1.5, 1.0]), 1.0);
        assert!(max_abs_difference(&array![1.0], &array![1.0, 2.0]).is_infinite());
    }

    #[test]
    fn test_mdp_pipeline_agrees_end_to_end() {
        let mdp = daily_choices(0.9);
        let mrp = collapse(&mdp, &seventy_thirty()).unwrap();
        let exact = exact_evaluate(&mrp).unwrap();
        let iterated = iterative_evaluate(&mrp, &EvaluationConfig::default()).unwrap();

        for (s, expected) in CHOICE_VALUES.iter().enumerate() {
            assert_abs_diff_eq!(exact[s], *expected, epsilon = 1e-9);
            assert_abs_diff_eq!(iterated.values[s], *expected, epsilon = AGREEMENT_TOLERANCE);
        }
    }

    #[test]
    fn test_shared_model_is_safe_to_evaluate_concurrently() {
        let mrp = daily_routine(0.9);
        let mdp = daily_choices(0.9);
        let policy = seventy_thirty();
        let reference = exact_evaluate(&mrp).unwrap();
        let reference_walk = simulate(
            &PolicyWalk::new(&mdp, &policy).unwrap(),
            &SimulationConfig::default(),
        )
        .unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let (mrp, mdp, policy) = (&mrp, &mdp, &policy);
                    scope.spawn(move || {
                        let values = if i % 2 == 0 {
                            exact_evaluate(mrp).unwrap()
                        } else {
                            iterative_evaluate(mrp, &EvaluationConfig::default())
                                .unwrap()
                                .values
                        };
                        let walk = PolicyWalk::new(mdp, policy).unwrap();
                        let trajectory = simulate(&walk, &SimulationConfig::default()).unwrap();
                        (values, trajectory)
                    })
                })
                .collect();

            for handle in handles {
                let (values, trajectory) = handle.join().unwrap();
                assert!(max_abs_difference(&values, &reference) < AGREEMENT_TOLERANCE);
                assert_eq!(trajectory, reference_walk);
            }
        });
    }
}
