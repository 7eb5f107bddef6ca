//! Dense linear solve for the Bellman system.
//!
//! Gaussian elimination with partial pivoting on an augmented copy of the
//! system; the inputs are never modified and no inverse is formed.

use ndarray::{Array1, Array2, Axis};

use crate::error::{Error, Result};
use crate::mdp::model::check_shape;
use crate::mdp::MAX_CONDITION_ESTIMATE;

/// Pivots at or below this multiple of the matrix scale count as zero.
const PIVOT_EPSILON: f64 = 1e-12;

/// Solution of `A x = b` plus a cheap conditioning estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub x: Array1<f64>,
    /// Ratio of the largest to the smallest pivot magnitude
    pub condition_estimate: f64,
}

/// Solves the square system `a * x = b`.
///
/// # Errors
/// [`Error::SingularSystem`] if a pivot vanishes relative to the scale of `a`
/// or the pivot ratio exceeds [`MAX_CONDITION_ESTIMATE`].
///
/// # Examples
///
/// ```
/// use markov_value::mdp::linalg::solve;
/// use ndarray::array;
///
/// let solution = solve(&array![[2.0, 1.0], [1.0, 3.0]], &array![3.0, 5.0]).unwrap();
/// assert!((solution.x[0] - 0.8).abs() < 1e-12);
/// assert!((solution.x[1] - 1.4).abs() < 1e-12);
/// ```
pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Solution> {
    let n = b.len();
    check_shape("system matrix", &[n, n], a.shape())?;

    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if n == 0 {
        return Ok(Solution {
            x: Array1::zeros(0),
            condition_estimate: 1.0,
        });
    }
    if scale == 0.0 || !scale.is_finite() {
        return Err(Error::SingularSystem { row: 0, pivot: 0.0 });
    }

    // Augmented matrix [a | b]
    let mut m = Array2::<f64>::zeros((n, n + 1));
    m.slice_mut(ndarray::s![.., ..n]).assign(a);
    m.column_mut(n).assign(b);

    let mut max_pivot = 0.0_f64;
    let mut min_pivot = f64::INFINITY;

    for i in 0..n {
        let pivot_row = (i..n)
            .max_by(|&x, &y| m[[x, i]].abs().total_cmp(&m[[y, i]].abs()))
            .unwrap_or(i);
        if pivot_row != i {
            for k in 0..=n {
                m.swap([i, k], [pivot_row, k]);
            }
        }

        let pivot = m[[i, i]];
        if pivot.abs() <= PIVOT_EPSILON * scale {
            return Err(Error::SingularSystem { row: i, pivot });
        }
        max_pivot = max_pivot.max(pivot.abs());
        min_pivot = min_pivot.min(pivot.abs());

        let pivot_vals = m.row(i).to_owned();
        for mut row in m.axis_iter_mut(Axis(0)).skip(i + 1) {
            let factor = row[i] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in i..=n {
                row[k] -= factor * pivot_vals[k];
            }
        }
    }

    let condition_estimate = max_pivot / min_pivot;
    if condition_estimate > MAX_CONDITION_ESTIMATE {
        return Err(Error::SingularSystem {
            row: n - 1,
            pivot: min_pivot,
        });
    }

    // Back substitution
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = m[[i, n]];
        for j in (i + 1)..n {
            sum -= m[[i, j]] * x[j];
        }
        x[i] = sum / m[[i, i]];
    }

    Ok(Solution {
        x,
        condition_estimate,
    })
}
