//! Gini coefficient for inequality measurement
//!
//! Applied to function sizes it detects god functions; applied to PageRank it
//! measures how concentrated centrality is; applied to author commit counts it
//! measures knowledge concentration.
//!
//! For ascending values `x_1 <= ... <= x_n`:
//! `G = 2·Σ(i·x_i) / (n·Σx_i) − (n+1)/n`

use super::{MathError, MathResult};

/// Gini coefficient in `[0, 1]`.
///
/// Empty, single-value and all-zero inputs return 0. Negative values are
/// rejected. `bias_correction` applies the `n/(n−1)` small-sample factor, which
/// never lowers the result.
pub fn gini_coefficient(values: &[f64], bias_correction: bool) -> MathResult<f64> {
    if let Some(&neg) = values.iter().find(|v| **v < 0.0) {
        return Err(MathError::NegativeValue(neg));
    }
    if values.len() < 2 {
        return Ok(0.0);
    }

    let total: f64 = values.iter().sum();
    if total == 0.0 {
        return Ok(0.0);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as f64;

    let weighted_sum: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64 + 1.0) * v)
        .sum();
    let mut gini = (2.0 * weighted_sum) / (n * total) - (n + 1.0) / n;

    if bias_correction {
        gini *= n / (n - 1.0);
    }

    Ok(gini.clamp(0.0, 1.0))
}

/// Convenience for integer samples such as function sizes.
pub fn gini_of_counts(values: &[usize], bias_correction: bool) -> f64 {
    let as_f64: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    // usize input cannot be negative
    gini_coefficient(&as_f64, bias_correction).unwrap_or(0.0)
}
