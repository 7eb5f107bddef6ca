//! Iterative policy evaluation.
//!
//! Applies synchronous Bellman backups `V_{k+1} = R + gamma * P * V_k` from
//! `V_0 = 0`. The backup is a max-norm contraction with modulus `gamma`, so
//! for `gamma < 1` it converges to the same fixed point [`crate::mdp::exact`]
//! computes; the iteration bound only caps runaway configurations.

use ndarray::Array1;

use crate::error::{Error, Result};
use crate::mdp::model::MarkovRewardProcess;
use crate::mdp::{exact, max_abs_difference, EvaluationConfig};

/// Outcome of a converged iterative evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The converged value vector `V_{k+1}`
    pub values: Array1<f64>,
    /// Number of backups performed
    pub iterations: usize,
    /// Every iterate from `V_0` on, when [`EvaluationConfig::record_history`] is set
    pub history: Option<Vec<Array1<f64>>>,
}

/// One synchronous Bellman backup.
fn backup(mrp: &MarkovRewardProcess, v: &Array1<f64>) -> Array1<f64> {
    mrp.rewards() + &(mrp.transitions().dot(v) * mrp.gamma())
}

/// Evaluates `mrp` by repeated Bellman backups.
///
/// Stops at the first `k` with `max_s |V_{k+1}[s] - V_k[s]| < tolerance` and
/// returns `V_{k+1}` together with the number of backups performed.
///
/// # Errors
/// - a validation error if `config.tolerance` is not finite and positive
/// - [`Error::Convergence`] if `config.max_iterations` backups do not meet the
///   tolerance; an unconverged estimate is never returned
///
/// # Examples
///
/// ```
/// use markov_value::mdp::{iterative_evaluate, EvaluationConfig, MarkovRewardProcess};
/// use ndarray::array;
///
/// let mrp = MarkovRewardProcess::new(["Only"], array![[1.0]], array![1.0], 0.5).unwrap();
/// let result = iterative_evaluate(&mrp, &EvaluationConfig::default()).unwrap();
/// assert!((result.values[0] - 2.0).abs() < 1e-5);
/// ```
pub fn evaluate(mrp: &MarkovRewardProcess, config: &EvaluationConfig) -> Result<Evaluation> {
    config.validate()?;

    let mut v = Array1::<f64>::zeros(mrp.num_states());
    let mut history = config.record_history.then(|| vec![v.clone()]);
    let mut delta = f64::INFINITY;

    for iteration in 1..=config.max_iterations {
        let v_new = backup(mrp, &v);
        delta = max_abs_difference(&v_new, &v);
        log::trace!("backup {}: delta {:e}", iteration, delta);

        if let Some(history) = history.as_mut() {
            history.push(v_new.clone());
        }
        if delta < config.tolerance {
            log::debug!("value iteration converged after {} iterations", iteration);
            return Ok(Evaluation {
                values: v_new,
                iterations: iteration,
                history,
            });
        }
        v = v_new;
    }

    log::warn!(
        "value iteration stopped after {} iterations with delta {:e}",
        config.max_iterations,
        delta
    );
    Err(Error::Convergence {
        iterations: config.max_iterations,
        delta,
    })
}

/// Runs exactly `sweeps` backups with no convergence test and returns
/// `V_0, V_1, ..., V_sweeps`, one row per iteration, for plotting.
pub fn history(mrp: &MarkovRewardProcess, sweeps: usize) -> Vec<Array1<f64>> {
    let mut v = Array1::<f64>::zeros(mrp.num_states());
    let mut history = Vec::with_capacity(sweeps + 1);
    history.push(v.clone());
    for _ in 0..sweeps {
        v = backup(mrp, &v);
        history.push(v.clone());
    }
    history
}

/// Evaluates `mrp` both exactly and iteratively and checks that they agree.
///
/// Returns the iterative result when the largest absolute difference between
/// the two value vectors is within `tolerance`.
///
/// Stopping once a sweep changes `V` by less than `delta` leaves an error of
/// at most `gamma / (1 - gamma) * delta`, so the iterative pass runs with its
/// sweep tolerance tightened to half of `tolerance * (1 - gamma) / gamma`
/// whenever that is smaller than `config.tolerance`. `config.max_iterations`
/// still bounds the pass and is reported as [`Error::Convergence`].
///
/// # Errors
/// Anything either evaluator reports, [`Error::Disagreement`] when the
/// results differ by more than `tolerance`, or a validation error for a
/// tolerance that is not finite and positive.
pub fn cross_check(
    mrp: &MarkovRewardProcess,
    config: &EvaluationConfig,
    tolerance: f64,
) -> Result<Evaluation> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(crate::error::ValidationError::InvalidTolerance(tolerance).into());
    }
    let gamma = mrp.gamma();
    let mut config = config.clone();
    if gamma > 0.0 {
        config.tolerance = config
            .tolerance
            .min(0.5 * tolerance * (1.0 - gamma) / gamma);
    }

    let exact = exact::evaluate(mrp)?;
    let evaluation = evaluate(mrp, &config)?;
    let difference = max_abs_difference(&exact, &evaluation.values);
    // Elementwise check through approx so NaN never passes.
    let agree = exact
        .iter()
        .zip(evaluation.values.iter())
        .all(|(a, b)| approx::abs_diff_eq!(*a, *b, epsilon = tolerance));
    if !agree {
        return Err(Error::Disagreement {
            difference,
            tolerance,
        });
    }
    Ok(evaluation)
}
