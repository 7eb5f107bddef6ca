//! Seeded random walks through a process, accumulating discounted return.
//!
//! A [`Walk`] knows how to take one step from a state; a [`Walker`] drives it
//! lazily for a fixed number of steps with an injected random number
//! generator, so equal seeds always reproduce equal trajectories.

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::fmt;

use crate::error::{Error, Result, ValidationError};
use crate::mdp::model::{MarkovDecisionProcess, MarkovRewardProcess};
use crate::mdp::policy::Policy;
use crate::mdp::SimulationConfig;

/// A process that can be walked one step at a time.
pub trait Walk {
    fn num_states(&self) -> usize;

    /// Discount applied per step.
    fn gamma(&self) -> f64;

    /// Reward collected in `state` and the successor state drawn from `rng`.
    fn step<R: Rng + ?Sized>(&self, state: usize, rng: &mut R) -> (f64, usize);
}

fn weighted_rows<'r, I>(what: &'static str, rows: I) -> Result<Vec<WeightedIndex<f64>>>
where
    I: IntoIterator<Item = ndarray::ArrayView1<'r, f64>>,
{
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            WeightedIndex::new(row.iter().copied()).map_err(|_| {
                Error::from(ValidationError::RowNotStochastic {
                    what,
                    row: i.to_string(),
                    sum: row.sum(),
                })
            })
        })
        .collect()
}

/// Walks an MRP by sampling successors straight from `P[state]`.
#[derive(Debug, Clone)]
pub struct RewardWalk<'a> {
    mrp: &'a MarkovRewardProcess,
    rows: Vec<WeightedIndex<f64>>,
}

impl<'a> RewardWalk<'a> {
    pub fn new(mrp: &'a MarkovRewardProcess) -> Result<Self> {
        let rows = weighted_rows("transition", mrp.transitions().outer_iter())?;
        Ok(Self { mrp, rows })
    }
}

impl Walk for RewardWalk<'_> {
    fn num_states(&self) -> usize {
        self.mrp.num_states()
    }

    fn gamma(&self) -> f64 {
        self.mrp.gamma()
    }

    fn step<R: Rng + ?Sized>(&self, state: usize, rng: &mut R) -> (f64, usize) {
        let reward = self.mrp.rewards()[state];
        (reward, self.rows[state].sample(rng))
    }
}

/// Walks an MDP under a policy: draw an action from `pi[state]`, then the
/// successor from `P[state][action]`.
#[derive(Debug, Clone)]
pub struct PolicyWalk<'a> {
    mdp: &'a MarkovDecisionProcess,
    actions: Vec<WeightedIndex<f64>>,
    /// Indexed by `state * num_actions + action`
    successors: Vec<WeightedIndex<f64>>,
}

impl<'a> PolicyWalk<'a> {
    pub fn new(mdp: &'a MarkovDecisionProcess, policy: &Policy) -> Result<Self> {
        policy.check_compatible(mdp)?;
        let actions = weighted_rows("policy", policy.probabilities().outer_iter())?;
        let (n, m) = (mdp.num_states(), mdp.num_actions());
        let successors = weighted_rows(
            "transition",
            (0..n).flat_map(|s| (0..m).map(move |a| mdp.next_state_distribution(s, a))),
        )?;
        Ok(Self {
            mdp,
            actions,
            successors,
        })
    }
}

impl Walk for PolicyWalk<'_> {
    fn num_states(&self) -> usize {
        self.mdp.num_states()
    }

    fn gamma(&self) -> f64 {
        self.mdp.gamma()
    }

    fn step<R: Rng + ?Sized>(&self, state: usize, rng: &mut R) -> (f64, usize) {
        let action = self.actions[state].sample(rng);
        let reward = self.mdp.rewards().get(state, action);
        let next = self.successors[state * self.mdp.num_actions() + action].sample(rng);
        (reward, next)
    }
}

/// One recorded step of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub t: usize,
    pub state: usize,
    pub reward: f64,
    /// `sum_{k <= t} gamma^k * reward_k`
    pub cumulative_return: f64,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:2} | state={:<4} | reward={:+} | return={:5.2}",
            self.t, self.state, self.reward, self.cumulative_return
        )
    }
}

/// Lazy iterator over the steps of one walk.
#[derive(Debug)]
pub struct Walker<'w, W, R> {
    walk: &'w W,
    rng: R,
    state: usize,
    t: usize,
    steps: usize,
    discount: f64,
    cumulative_return: f64,
}

impl<'w, W: Walk, R: Rng> Walker<'w, W, R> {
    /// Starts a walk of `steps` steps in `start`, drawing from `rng`.
    ///
    /// # Errors
    /// A validation error if `start` is not a state of `walk`.
    pub fn new(walk: &'w W, start: usize, steps: usize, rng: R) -> Result<Self> {
        if start >= walk.num_states() {
            return Err(ValidationError::StateOutOfRange {
                index: start,
                num_states: walk.num_states(),
            }
            .into());
        }
        Ok(Self {
            walk,
            rng,
            state: start,
            t: 0,
            steps,
            discount: 1.0,
            cumulative_return: 0.0,
        })
    }
}

impl<W: Walk, R: Rng> Iterator for Walker<'_, W, R> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        if self.t >= self.steps {
            return None;
        }
        let (reward, next) = self.walk.step(self.state, &mut self.rng);
        self.cumulative_return += self.discount * reward;
        let step = Step {
            t: self.t,
            state: self.state,
            reward,
            cumulative_return: self.cumulative_return,
        };
        log::trace!("{}", step);

        self.discount *= self.walk.gamma();
        self.state = next;
        self.t += 1;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.steps - self.t;
        (left, Some(left))
    }
}

/// A finished walk, owned by the caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    pub steps: Vec<Step>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Discounted return of the whole walk, zero when empty.
    pub fn total_return(&self) -> f64 {
        self.steps.last().map_or(0.0, |s| s.cumulative_return)
    }

    /// Visited states in order.
    pub fn states(&self) -> Vec<usize> {
        self.steps.iter().map(|s| s.state).collect()
    }

    /// One line per step, with state indices replaced by `labels`.
    pub fn render(&self, labels: &[String]) -> String {
        self.steps
            .iter()
            .map(|s| {
                let label = labels
                    .get(s.state)
                    .cloned()
                    .unwrap_or_else(|| s.state.to_string());
                format!(
                    "t={:2} | state={:<4} | reward={:+} | return={:5.2}",
                    s.t, label, s.reward, s.cumulative_return
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<Step> for Trajectory {
    fn from_iter<T: IntoIterator<Item = Step>>(iter: T) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

/// Simulates `config.steps` steps of `walk` from `config.start_state`, seeding
/// a ChaCha generator with `config.seed`.
///
/// # Examples
///
/// ```
/// use markov_value::mdp::{simulate, MarkovRewardProcess, RewardWalk, SimulationConfig};
/// use ndarray::array;
///
/// let mrp = MarkovRewardProcess::new(
///     ["Sunny", "Rainy"],
///     array![[0.8, 0.2], [0.4, 0.6]],
///     array![1.0, -1.0],
///     0.9,
/// )
/// .unwrap();
/// let walk = RewardWalk::new(&mrp).unwrap();
/// let config = SimulationConfig { start_state: 0, steps: 10, seed: 7 };
///
/// let trajectory = simulate(&walk, &config).unwrap();
/// assert_eq!(trajectory.len(), 10);
/// assert_eq!(trajectory, simulate(&walk, &config).unwrap());
/// ```
pub fn simulate<W: Walk>(walk: &W, config: &SimulationConfig) -> Result<Trajectory> {
    let rng = ChaCha20Rng::seed_from_u64(config.seed);
    Ok(Walker::new(walk, config.start_state, config.steps, rng)?.collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdp::fixtures::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn config(seed: u64, steps: usize) -> SimulationConfig {
        SimulationConfig {
            start_state: 0,
            steps,
            seed,
        }
    }

    #[test]
    fn test_same_seed_reproduces_trajectory() {
        let mrp = daily_routine(0.9);
        let walk = RewardWalk::new(&mrp).unwrap();
        let a = simulate(&walk, &config(42, 50)).unwrap();
        let b = simulate(&walk, &config(42, 50)).unwrap();
        assert_eq!(a, b);
        for (x, y) in a.steps.iter().zip(b.steps.iter()) {
            assert_eq!(x.cumulative_return.to_bits(), y.cumulative_return.to_bits());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mrp = daily_routine(0.9);
        let walk = RewardWalk::new(&mrp).unwrap();
        let a = simulate(&walk, &config(1, 50)).unwrap();
        let b = simulate(&walk, &config(2, 50)).unwrap();
        assert_ne!(a.states(), b.states());
    }

    #[test]
    fn test_policy_walk_is_reproducible() {
        let mdp = daily_choices(0.9);
        let policy = seventy_thirty();
        let walk = PolicyWalk::new(&mdp, &policy).unwrap();
        let a = simulate(&walk, &config(1, 40)).unwrap();
        assert_eq!(a, simulate(&walk, &config(1, 40)).unwrap());
        assert_ne!(a.states(), simulate(&walk, &config(3, 40)).unwrap().states());
    }

    #[test]
    fn test_rewards_and_returns_follow_the_visited_states() {
        let mrp = daily_routine(0.9);
        let walk = RewardWalk::new(&mrp).unwrap();
        let trajectory = simulate(&walk, &config(42, 25)).unwrap();

        assert_eq!(trajectory.steps[0].state, 0);
        assert_eq!(trajectory.steps[0].reward, 1.0);
        assert_eq!(trajectory.steps[0].cumulative_return, 1.0);

        let mut expected = 0.0;
        for (t, step) in trajectory.steps.iter().enumerate() {
            assert_eq!(step.t, t);
            assert_eq!(step.reward, mrp.rewards()[step.state]);
            expected += 0.9_f64.powi(t as i32) * step.reward;
            assert_abs_diff_eq!(step.cumulative_return, expected, epsilon = 1e-9);
        }
        assert_eq!(trajectory.total_return(), trajectory.steps[24].cumulative_return);
    }

    #[test]
    fn test_deterministic_cycle() {
        let mrp = MarkovRewardProcess::new(
            ["A", "B"],
            array![[0.0, 1.0], [1.0, 0.0]],
            array![1.0, 0.0],
            0.5,
        )
        .unwrap();
        let walk = RewardWalk::new(&mrp).unwrap();
        let trajectory = simulate(&walk, &config(9, 4)).unwrap();
        assert_eq!(trajectory.states(), vec![0, 1, 0, 1]);
        assert_eq!(trajectory.total_return(), 1.25);
    }

    #[test]
    fn test_action_rewards_use_sampled_action() {
        let mdp = MarkovDecisionProcess::new(
            ["A", "B"],
            ["stay", "move"],
            array![[[1.0, 0.0], [0.0, 1.0]], [[0.0, 1.0], [1.0, 0.0]]],
            array![[10.0, 1.0], [20.0, 2.0]],
            0.5,
        )
        .unwrap();
        let policy = Policy::deterministic(&[1, 0], 2).unwrap();
        let walk = PolicyWalk::new(&mdp, &policy).unwrap();
        let trajectory = simulate(&walk, &config(0, 3)).unwrap();
        assert_eq!(trajectory.states(), vec![0, 1, 1]);
        let rewards: Vec<f64> = trajectory.steps.iter().map(|s| s.reward).collect();
        assert_eq!(rewards, vec![1.0, 20.0, 20.0]);
        assert_eq!(trajectory.total_return(), 1.0 + 10.0 + 5.0);
    }

    #[test]
    fn test_successors_stay_in_support_of_chosen_action() {
        // Always "Alternate" from Home can only lead back Home or to the Bar.
        let mdp = daily_choices(0.9);
        let policy = Policy::deterministic(&[1, 1, 1, 1], 2).unwrap();
        let walk = PolicyWalk::new(&mdp, &policy).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        for _ in 0..500 {
            let (reward, next) = walk.step(0, &mut rng);
            assert_eq!(reward, 1.0);
            assert!(next == 0 || next == 3);
        }
    }

    #[test]
    fn test_successor_frequencies_follow_transition_row() {
        let mrp = daily_routine(0.9);
        let walk = RewardWalk::new(&mrp).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let n = 20_000;
        let mut counts = [0usize; 4];
        for _ in 0..n {
            counts[walk.step(0, &mut rng).1] += 1;
        }
        for (count, p) in counts.iter().zip([0.10, 0.60, 0.20, 0.10]) {
            assert_abs_diff_eq!(*count as f64 / n as f64, p, epsilon = 0.02);
        }
    }

    #[test]
    fn test_walker_is_lazy_and_sized() {
        let mrp = daily_routine(0.9);
        let walk = RewardWalk::new(&mrp).unwrap();
        let walker = Walker::new(&walk, 2, 1_000_000, ChaCha20Rng::seed_from_u64(3)).unwrap();
        assert_eq!(walker.size_hint(), (1_000_000, Some(1_000_000)));
        let first: Vec<Step> = walker.take(3).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].state, 2);
    }

    #[test]
    fn test_out_of_range_start_is_rejected() {
        let mrp = daily_routine(0.9);
        let walk = RewardWalk::new(&mrp).unwrap();
        let err = simulate(
            &walk,
            &SimulationConfig {
                start_state: 4,
                ..SimulationConfig::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::Validation(ValidationError::StateOutOfRange {
                index: 4,
                num_states: 4
            })
        );
    }

    #[test]
    fn test_zero_steps_is_empty() {
        let mrp = daily_routine(0.9);
        let walk = RewardWalk::new(&mrp).unwrap();
        let trajectory = simulate(&walk, &config(1, 0)).unwrap();
        assert!(trajectory.is_empty());
        assert_eq!(trajectory.total_return(), 0.0);
    }

    #[test]
    fn test_render_uses_labels() {
        let mrp = daily_routine(0.9);
        let walk = RewardWalk::new(&mrp).unwrap();
        let trajectory = simulate(&walk, &config(42, 2)).unwrap();
        let rendered = trajectory.render(mrp.states());
        let first = rendered.lines().next().unwrap();
        assert_eq!(first, "t= 0 | state=Home | reward=+1 | return= 1.00");
        assert_eq!(
            trajectory.steps[0].to_string(),
            "t= 0 | state=0    | reward=+1 | return= 1.00"
        );
    }
}
