//! Immutable descriptions of finite Markov reward and decision processes.
//!
//! States (and actions) are ordered, distinct labels; a label's position is the
//! index used by every matrix and vector in the crate.

use ndarray::{Array1, Array2, Array3, ArrayView1};
use std::collections::HashSet;

use crate::error::{Result, ValidationError};
use crate::mdp::PROBABILITY_TOLERANCE;

/// Reward model of a decision process.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewards {
    /// `R[s]`, collected in state `s` whatever the action
    State(Array1<f64>),
    /// `R[s, a]`, collected when action `a` is taken in state `s`
    StateAction(Array2<f64>),
}

impl From<Array1<f64>> for Rewards {
    fn from(rewards: Array1<f64>) -> Self {
        Rewards::State(rewards)
    }
}

impl From<Array2<f64>> for Rewards {
    fn from(rewards: Array2<f64>) -> Self {
        Rewards::StateAction(rewards)
    }
}

impl Rewards {
    /// Reward for taking `action` in `state`. `action` is ignored for
    /// state-only rewards.
    ///
    /// # Panics
    /// Panics if `state` or `action` is out of range for the model.
    pub fn get(&self, state: usize, action: usize) -> f64 {
        match self {
            Rewards::State(r) => r[state],
            Rewards::StateAction(r) => r[[state, action]],
        }
    }
}

/// A Markov chain with a reward per state and a discount factor.
///
/// # Examples
///
/// ```
/// use markov_value::mdp::MarkovRewardProcess;
/// use ndarray::array;
///
/// let mrp = MarkovRewardProcess::new(
///     ["Sunny", "Rainy"],
///     array![[0.8, 0.2], [0.4, 0.6]],
///     array![1.0, -1.0],
///     0.9,
/// )
/// .unwrap();
///
/// assert_eq!(mrp.num_states(), 2);
/// assert_eq!(mrp.index_of("Rainy"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovRewardProcess {
    states: Vec<String>,
    transitions: Array2<f64>,
    rewards: Array1<f64>,
    gamma: f64,
}

impl MarkovRewardProcess {
    /// Creates an MRP from state labels, an S x S row-stochastic transition
    /// matrix, a length-S reward vector and a discount factor in `[0, 1)`.
    ///
    /// # Errors
    /// Returns a validation error if the labels are empty or repeated, the
    /// shapes disagree with the number of states, a row is not a probability
    /// distribution within [`PROBABILITY_TOLERANCE`], a reward is not finite,
    /// or `gamma` is outside `[0, 1)`.
    pub fn new<I, L>(
        states: I,
        transitions: Array2<f64>,
        rewards: Array1<f64>,
        gamma: f64,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let states = collect_labels(states, ValidationError::EmptyStateSet)?;
        let n = states.len();

        check_shape("transition matrix", &[n, n], transitions.shape())?;
        check_shape("reward vector", &[n], rewards.shape())?;
        for (s, row) in transitions.outer_iter().enumerate() {
            check_distribution("transition", || states[s].clone(), row)?;
        }
        for (s, &r) in rewards.iter().enumerate() {
            check_reward(|| states[s].clone(), r)?;
        }
        check_discount(gamma)?;

        log::debug!("built MRP with {} states, gamma {}", n, gamma);
        Ok(Self {
            states,
            transitions,
            rewards,
            gamma,
        })
    }

    /// Number of states `S`.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// State labels in index order.
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// Label of the state at `index`.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.states.get(index).map(String::as_str)
    }

    /// Index of the state called `label`.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.states.iter().position(|s| s == label)
    }

    /// The S x S transition matrix `P`.
    pub fn transitions(&self) -> &Array2<f64> {
        &self.transitions
    }

    /// The length-S reward vector `R`.
    pub fn rewards(&self) -> &Array1<f64> {
        &self.rewards
    }

    /// The discount factor.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Fails unless `index` names a state of this process.
    pub fn check_state(&self, index: usize) -> Result<()> {
        check_index(index, self.num_states())
    }
}

/// A Markov decision process with a finite action set.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovDecisionProcess {
    states: Vec<String>,
    actions: Vec<String>,
    /// `transitions[[s, a, s_next]]`
    transitions: Array3<f64>,
    rewards: Rewards,
    gamma: f64,
}

impl MarkovDecisionProcess {
    /// Creates an MDP from state and action labels, an S x A x S transition
    /// tensor whose `(s, a)` slices are probability distributions, a reward
    /// model and a discount factor in `[0, 1)`.
    ///
    /// `rewards` is a length-S vector for the usual state-only reward model,
    /// or an S x A matrix for action-dependent rewards.
    ///
    /// # Errors
    /// The same validation errors as [`MarkovRewardProcess::new`], plus an
    /// empty or repeated action set.
    pub fn new<I, L, J, M>(
        states: I,
        actions: J,
        transitions: Array3<f64>,
        rewards: impl Into<Rewards>,
        gamma: f64,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
        J: IntoIterator<Item = M>,
        M: Into<String>,
    {
        let states = collect_labels(states, ValidationError::EmptyStateSet)?;
        let actions = collect_labels(actions, ValidationError::EmptyActionSet)?;
        let (n, m) = (states.len(), actions.len());
        let rewards = rewards.into();

        check_shape("transition tensor", &[n, m, n], transitions.shape())?;
        for s in 0..n {
            for a in 0..m {
                let row = transitions.slice(ndarray::s![s, a, ..]);
                let label = || format!("{}/{}", states[s], actions[a]);
                check_distribution("transition", label, row)?;
            }
        }
        match &rewards {
            Rewards::State(r) => {
                check_shape("reward vector", &[n], r.shape())?;
                for (s, &value) in r.iter().enumerate() {
                    check_reward(|| states[s].clone(), value)?;
                }
            }
            Rewards::StateAction(r) => {
                check_shape("reward matrix", &[n, m], r.shape())?;
                for ((s, a), &value) in r.indexed_iter() {
                    check_reward(|| format!("{}/{}", states[s], actions[a]), value)?;
                }
            }
        }
        check_discount(gamma)?;

        log::debug!(
            "built MDP with {} states, {} actions, gamma {}",
            n,
            m,
            gamma
        );
        Ok(Self {
            states,
            actions,
            transitions,
            rewards,
            gamma,
        })
    }

    /// Number of states `S`.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Number of actions `A`.
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Index of the state called `label`.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.states.iter().position(|s| s == label)
    }

    /// Index of the action called `label`.
    pub fn action_index_of(&self, label: &str) -> Option<usize> {
        self.actions.iter().position(|a| a == label)
    }

    /// The S x A x S transition tensor `P`.
    pub fn transitions(&self) -> &Array3<f64> {
        &self.transitions
    }

    /// Distribution over next states after taking `action` in `state`.
    pub fn next_state_distribution(&self, state: usize, action: usize) -> ArrayView1<'_, f64> {
        self.transitions.slice(ndarray::s![state, action, ..])
    }

    pub fn rewards(&self) -> &Rewards {
        &self.rewards
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Fails unless `index` names a state of this process.
    pub fn check_state(&self, index: usize) -> Result<()> {
        check_index(index, self.num_states())
    }
}

fn collect_labels<I, L>(labels: I, empty: ValidationError) -> Result<Vec<String>>
where
    I: IntoIterator<Item = L>,
    L: Into<String>,
{
    let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
    if labels.is_empty() {
        return Err(empty.into());
    }
    let mut seen = HashSet::with_capacity(labels.len());
    for label in &labels {
        if !seen.insert(label.as_str()) {
            return Err(ValidationError::DuplicateLabel(label.clone()).into());
        }
    }
    Ok(labels)
}

pub(crate) fn check_shape(what: &'static str, expected: &[usize], found: &[usize]) -> Result<()> {
    if expected != found {
        return Err(ValidationError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
        .into());
    }
    Ok(())
}

/// Checks that `row` is a probability distribution.
pub(crate) fn check_distribution<F>(
    what: &'static str,
    row_label: F,
    row: ArrayView1<f64>,
) -> Result<()>
where
    F: Fn() -> String,
{
    if let Some(&value) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(ValidationError::InvalidProbability {
            what,
            row: row_label(),
            value,
        }
        .into());
    }
    let sum = row.sum();
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(ValidationError::RowNotStochastic {
            what,
            row: row_label(),
            sum,
        }
        .into());
    }
    Ok(())
}

fn check_reward<F>(at: F, value: f64) -> Result<()>
where
    F: Fn() -> String,
{
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteReward { at: at(), value }.into());
    }
    Ok(())
}

fn check_discount(gamma: f64) -> Result<()> {
    if !(0.0..1.0).contains(&gamma) {
        return Err(ValidationError::DiscountOutOfRange(gamma).into());
    }
    Ok(())
}

fn check_index(index: usize, num_states: usize) -> Result<()> {
    if index >= num_states {
        return Err(ValidationError::StateOutOfRange { index, num_states }.into());
    }
    Ok(())
}
