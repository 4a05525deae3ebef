//! Classical statistics: moments, Grubbs' test, Mahalanobis distance,
//! Student-t quantiles and confidence intervals
//!
//! The t-distribution is evaluated through the regularized incomplete beta
//! function (Lentz continued fraction) and inverted by bisection, so no
//! statistics crate is needed.

use super::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1 denominator). 0 for fewer than 2 values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Population standard deviation (n denominator).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Z-scores against the population standard deviation; zeros when it is 0.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let std = population_std(values);
    if std == 0.0 {
        return vec![0.0; values.len()];
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) / std).collect()
}

/// Grubbs' test for a single outlier at significance `alpha`.
///
/// Returns `(index, G)` of the most extreme value when `G` exceeds the
/// critical value. `None` below 3 values, on zero variance, or when no
/// outlier is significant.
pub fn grubbs_test(values: &[f64], alpha: f64) -> Option<(usize, f64)> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let m = mean(values);
    let s = sample_std(values);
    if s == 0.0 {
        return None;
    }

    let (index, max_dev) = values
        .iter()
        .map(|v| (v - m).abs())
        .enumerate()
        .fold((0, f64::MIN), |best, (i, d)| if d > best.1 { (i, d) } else { best });
    let g = max_dev / s;

    let nf = n as f64;
    let df = nf - 2.0;
    let t = student_t_quantile(1.0 - alpha / (2.0 * nf), df).ok()?;
    let g_crit = ((nf - 1.0) / nf.sqrt()) * (t * t / (df + t * t)).sqrt();

    (g > g_crit).then_some((index, g))
}

/// Squared Mahalanobis distance `(x − μ)ᵀ Σ⁻¹ (x − μ)`.
///
/// Falls back to the Moore-Penrose pseudo-inverse when `Σ` is singular.
pub fn mahalanobis_distance(point: &[f64], mean: &[f64], covariance: &[Vec<f64>]) -> MathResult<f64> {
    let dim = point.len();
    if mean.len() != dim {
        return Err(MathError::DimensionMismatch { expected: dim, actual: mean.len() });
    }
    if covariance.len() != dim {
        return Err(MathError::DimensionMismatch { expected: dim, actual: covariance.len() });
    }
    if let Some(row) = covariance.iter().find(|row| row.len() != dim) {
        return Err(MathError::DimensionMismatch { expected: dim, actual: row.len() });
    }

    let cov = DMatrix::from_fn(dim, dim, |r, c| covariance[r][c]);
    let diff = DVector::from_iterator(dim, point.iter().zip(mean).map(|(x, m)| x - m));

    let inv = match cov.clone().try_inverse() {
        Some(inv) => inv,
        None => cov
            .pseudo_inverse(1e-12)
            .map_err(|e| MathError::InvalidParameter(e.to_string()))?,
    };

    Ok(diff.dot(&(inv * &diff)))
}

/// Two-sided confidence interval for the mean: `x̄ ± t·s/√n`.
///
/// Fewer than two values collapse to `(v, v)` or `(0, 0)`.
pub fn confidence_interval(values: &[f64], confidence: f64) -> MathResult<(f64, f64)> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(MathError::InvalidParameter(format!(
            "confidence must be in (0, 1), got {confidence}"
        )));
    }
    match values.len() {
        0 => return Ok((0.0, 0.0)),
        1 => return Ok((values[0], values[0])),
        _ => {}
    }

    let n = values.len() as f64;
    let m = mean(values);
    let s = sample_std(values);
    let alpha = 1.0 - confidence;
    let t = student_t_quantile(1.0 - alpha / 2.0, n - 1.0)?;
    let margin = t * s / n.sqrt();
    Ok((m - margin, m + margin))
}

// ==================== Student t distribution ====================

/// CDF of Student's t with `df` degrees of freedom.
pub fn student_t_cdf(t: f64, df: f64) -> f64 {
    let x = df / (df + t * t);
    let tail = 0.5 * regularized_incomplete_beta(x, df / 2.0, 0.5);
    if t >= 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

/// Quantile (inverse CDF) of Student's t.
pub fn student_t_quantile(p: f64, df: f64) -> MathResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(MathError::InvalidParameter(format!("probability must be in (0, 1), got {p}")));
    }
    if df <= 0.0 {
        return Err(MathError::InvalidParameter(format!("degrees of freedom must be positive, got {df}")));
    }
    if p == 0.5 {
        return Ok(0.0);
    }

    // t is symmetric: solve for the upper tail and mirror
    let target = if p > 0.5 { p } else { 1.0 - p };
    let mut lo = 0.0;
    let mut hi = 1.0;
    while student_t_cdf(hi, df) < target && hi < 1e12 {
        lo = hi;
        hi *= 2.0;
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if student_t_cdf(mid, df) < target {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-12 * hi.max(1.0) {
            break;
        }
    }
    let q = 0.5 * (lo + hi);
    Ok(if p > 0.5 { q } else { -q })
}

fn ln_gamma(x: f64) -> f64 {
    // Lanczos approximation, g = 7
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = COEFFS[0];
    let t = x + 7.5;
    for (i, c) in COEFFS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b
    }
}

fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    const TINY: f64 = 1e-300;
    const EPS: f64 = 1e-15;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=300 {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_t_quantiles_match_tables() {
        assert!(close(student_t_quantile(0.975, 1.0).unwrap(), 12.706, 1e-3));
        assert!(close(student_t_quantile(0.975, 10.0).unwrap(), 2.228, 1e-3));
        assert!(close(student_t_quantile(0.95, 30.0).unwrap(), 1.697, 1e-3));
        assert!(close(student_t_quantile(0.025, 10.0).unwrap(), -2.228, 1e-3));
    }

    #[test]
    fn test_t_cdf_symmetry() {
        for t in [0.3, 1.0, 2.5] {
            let sum = student_t_cdf(t, 7.0) + student_t_cdf(-t, 7.0);
            assert!(close(sum, 1.0, 1e-12));
        }
    }

    #[test]
    fn test_grubbs_requires_three_values() {
        assert_eq!(grubbs_test(&[1.0, 100.0], 0.05), None);
    }

    #[test]
    fn test_grubbs_zero_variance() {
        assert_eq!(grubbs_test(&[4.0, 4.0, 4.0, 4.0], 0.05), None);
    }

    #[test]
    fn test_grubbs_finds_outlier() {
        let values = [10.0, 10.2, 9.9, 10.1, 10.0, 9.8, 10.1, 25.0];
        let (index, g) = grubbs_test(&values, 0.05).unwrap();
        assert_eq!(index, 7);
        assert!(g > 2.0);
    }

    #[test]
    fn test_mahalanobis_identity() {
        let cov = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let d = mahalanobis_distance(&[3.0, 4.0], &[0.0, 0.0], &cov).unwrap();
        assert!(close(d, 25.0, 1e-9));
    }

    #[test]
    fn test_mahalanobis_singular_uses_pinv() {
        let cov = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let d = mahalanobis_distance(&[1.0, 1.0], &[0.0, 0.0], &cov).unwrap();
        assert!(close(d, 1.0, 1e-9));
    }

    #[test]
    fn test_mahalanobis_dimension_mismatch() {
        let cov = vec![vec![1.0]];
        let result = mahalanobis_distance(&[1.0, 2.0], &[0.0, 0.0], &cov);
        assert!(matches!(result, Err(MathError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_confidence_interval_widens_with_level() {
        let values = [4.0, 5.0, 6.0, 5.5, 4.5, 5.2];
        let (lo90, hi90) = confidence_interval(&values, 0.90).unwrap();
        let (lo95, hi95) = confidence_interval(&values, 0.95).unwrap();
        let (lo99, hi99) = confidence_interval(&values, 0.99).unwrap();
        assert!(hi95 - lo95 > hi90 - lo90);
        assert!(hi99 - lo99 > hi95 - lo95);
        assert!(lo99 < mean(&values) && mean(&values) < hi99);
    }

    #[test]
    fn test_confidence_interval_small_samples() {
        assert_eq!(confidence_interval(&[], 0.95).unwrap(), (0.0, 0.0));
        assert_eq!(confidence_interval(&[3.0], 0.95).unwrap(), (3.0, 3.0));
        assert!(confidence_interval(&[1.0, 2.0], 1.5).is_err());
    }
}
