//! Monte Carlo estimation of a state's value from many seeded walks.
//!
//! Episodes run in parallel on the rayon pool. Episode `i` is seeded with
//! `seed + i` and the returns are summed in episode order, so the estimate is
//! the same however the work is scheduled.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use crate::error::{Result, ValidationError};
use crate::mdp::simulation::{Walk, Walker};
use crate::mdp::SimulationConfig;

/// Sample mean of discounted returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub mean: f64,
    /// Standard error of the mean, zero for a single episode
    pub std_error: f64,
    pub episodes: usize,
}

/// Estimates the value of `config.start_state` as the mean discounted return
/// of `episodes` walks of `config.steps` steps each.
///
/// The truncated tail of each walk is worth at most
/// `gamma^steps * max|R| / (1 - gamma)`, so pick `steps` accordingly.
///
/// # Errors
/// A validation error for zero episodes or an out-of-range start state.
pub fn estimate_value<W>(walk: &W, config: &SimulationConfig, episodes: usize) -> Result<Estimate>
where
    W: Walk + Sync,
{
    if episodes == 0 {
        return Err(ValidationError::NoEpisodes.into());
    }

    let returns = (0..episodes)
        .into_par_iter()
        .map(|i| -> Result<f64> {
            let rng = ChaCha20Rng::seed_from_u64(config.seed.wrapping_add(i as u64));
            let walker = Walker::new(walk, config.start_state, config.steps, rng)?;
            Ok(walker.last().map_or(0.0, |step| step.cumulative_return))
        })
        .collect::<Result<Vec<f64>>>()?;

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let std_error = if returns.len() > 1 {
        let variance = returns.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / (n - 1.0);
        (variance / n).sqrt()
    } else {
        0.0
    };
    log::debug!(
        "monte carlo estimate over {} episodes: {:.4} +/- {:.4}",
        episodes,
        mean,
        std_error
    );

    Ok(Estimate {
        mean,
        std_error,
        episodes,
    })
}
