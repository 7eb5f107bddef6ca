//! Stochastic policies and the collapse of an MDP into the MRP a policy induces.

use ndarray::{Array1, Array2};

use crate::error::{Result, ValidationError};
use crate::mdp::model::{
    check_distribution, check_shape, MarkovDecisionProcess, MarkovRewardProcess, Rewards,
};

/// A stochastic policy: row `s` is the distribution over actions in state `s`.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    probabilities: Array2<f64>,
}

impl Policy {
    /// Wraps an S x A matrix whose rows are probability distributions.
    pub fn new(probabilities: Array2<f64>) -> Result<Self> {
        for (s, row) in probabilities.outer_iter().enumerate() {
            check_distribution("policy", || s.to_string(), row)?;
        }
        Ok(Self { probabilities })
    }

    /// Every action equally likely in every state.
    pub fn uniform(num_states: usize, num_actions: usize) -> Result<Self> {
        if num_actions == 0 {
            return Err(ValidationError::EmptyActionSet.into());
        }
        Self::new(Array2::from_elem(
            (num_states, num_actions),
            1.0 / num_actions as f64,
        ))
    }

    /// The same action distribution in every state.
    pub fn from_row(num_states: usize, row: &[f64]) -> Result<Self> {
        let row = Array1::from(row.to_vec());
        let probabilities = Array2::from_shape_fn((num_states, row.len()), |(_, a)| row[a]);
        Self::new(probabilities)
    }

    /// Takes `actions[s]` in state `s` with probability 1.
    pub fn deterministic(actions: &[usize], num_actions: usize) -> Result<Self> {
        let mut probabilities = Array2::zeros((actions.len(), num_actions));
        for (s, &a) in actions.iter().enumerate() {
            if a >= num_actions {
                return Err(ValidationError::ActionOutOfRange {
                    index: a,
                    num_actions,
                }
                .into());
            }
            probabilities[[s, a]] = 1.0;
        }
        Self::new(probabilities)
    }

    pub fn num_states(&self) -> usize {
        self.probabilities.nrows()
    }

    pub fn num_actions(&self) -> usize {
        self.probabilities.ncols()
    }

    /// The S x A probability matrix.
    pub fn probabilities(&self) -> &Array2<f64> {
        &self.probabilities
    }

    /// Probability of taking `action` in `state`.
    ///
    /// # Panics
    /// Panics if `state` or `action` is out of range; see [`Policy::check_compatible`].
    pub fn probability(&self, state: usize, action: usize) -> f64 {
        self.probabilities[[state, action]]
    }

    /// Fails unless this policy is shaped for `mdp`.
    pub fn check_compatible(&self, mdp: &MarkovDecisionProcess) -> Result<()> {
        check_shape(
            "policy",
            &[mdp.num_states(), mdp.num_actions()],
            self.probabilities.shape(),
        )
    }
}

/// Collapses `mdp` under `policy` into the Markov reward process it induces.
///
/// `P_pi[s][s'] = sum_a pi[s][a] * P[s][a][s']`, each row rescaled to sum to
/// exactly 1. With state-only rewards `R_pi = R`; with action-dependent
/// rewards `R_pi[s] = sum_a pi[s][a] * R[s][a]`.
///
/// # Examples
///
/// ```
/// use markov_value::mdp::{collapse, MarkovDecisionProcess, Policy};
/// use ndarray::array;
///
/// let mdp = MarkovDecisionProcess::new(
///     ["Left", "Right"],
///     ["Stay", "Switch"],
///     array![[[1.0, 0.0], [0.0, 1.0]], [[0.0, 1.0], [1.0, 0.0]]],
///     array![0.0, 1.0],
///     0.5,
/// )
/// .unwrap();
/// let mrp = collapse(&mdp, &Policy::uniform(2, 2).unwrap()).unwrap();
///
/// assert_eq!(mrp.transitions(), &array![[0.5, 0.5], [0.5, 0.5]]);
/// ```
pub fn collapse(mdp: &MarkovDecisionProcess, policy: &Policy) -> Result<MarkovRewardProcess> {
    policy.check_compatible(mdp)?;

    let (n, m) = (mdp.num_states(), mdp.num_actions());
    let p = mdp.transitions();
    let pi = policy.probabilities();

    let mut transitions = Array2::zeros((n, n));
    for s in 0..n {
        for a in 0..m {
            let weight = pi[[s, a]];
            if weight == 0.0 {
                continue;
            }
            for s_next in 0..n {
                transitions[[s, s_next]] += weight * p[[s, a, s_next]];
            }
        }
    }
    // Rows of pi and P may each be off by the validation tolerance; their
    // products can drift further, so each induced row is renormalised.
    for mut row in transitions.rows_mut() {
        let sum = row.sum();
        row /= sum;
    }

    let rewards = match mdp.rewards() {
        Rewards::State(r) => r.clone(),
        Rewards::StateAction(r) => (pi * r).sum_axis(ndarray::Axis(1)),
    };

    MarkovRewardProcess::new(mdp.states().iter().cloned(), transitions, rewards, mdp.gamma())
}
