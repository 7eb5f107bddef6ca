//! Closed-form policy evaluation.
//!
//! The Bellman expectation equation `V = R + gamma * P * V` is linear in `V`,
//! so its fixed point is the solution of `(I - gamma * P) V = R`.

use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::mdp::linalg;
use crate::mdp::model::MarkovRewardProcess;

/// Solves the Bellman system of `mrp` exactly.
///
/// Returns a fresh value vector; `mrp` is not modified.
///
/// # Errors
/// [`crate::Error::SingularSystem`] if `I - gamma * P` cannot be solved with
/// acceptable conditioning. A validly constructed model never triggers this.
///
/// # Examples
///
/// ```
/// use markov_value::mdp::{exact_evaluate, MarkovRewardProcess};
/// use ndarray::array;
///
/// // A single absorbing state paying 1 per step is worth 1 / (1 - gamma).
/// let mrp = MarkovRewardProcess::new(["Only"], array![[1.0]], array![1.0], 0.5).unwrap();
/// let values = exact_evaluate(&mrp).unwrap();
/// assert!((values[0] - 2.0).abs() < 1e-12);
/// ```
pub fn evaluate(mrp: &MarkovRewardProcess) -> Result<Array1<f64>> {
    let n = mrp.num_states();
    let system = Array2::<f64>::eye(n) - mrp.transitions() * mrp.gamma();
    let solution = linalg::solve(&system, mrp.rewards())?;
    log::debug!(
        "exact evaluation of {} states, pivot ratio {:.3e}",
        n,
        solution.condition_estimate
    );
    Ok(solution.x)
}
