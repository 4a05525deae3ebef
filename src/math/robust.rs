//! Robust statistics: median, MAD, modified z-scores, IQR outliers

/// Median of the values (mean of the two middle values for even length).
///
/// Returns 0 for empty input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Percentile `q` in `[0, 100]` with linear interpolation between ranks.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Median absolute deviation `median(|x − median(x)|)`.
pub fn median_absolute_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    median(&deviations)
}

/// Modified z-scores `0.6745·(x − median)/MAD`. All zero when MAD is 0.
pub fn modified_z_scores(values: &[f64]) -> Vec<f64> {
    let mad = median_absolute_deviation(values);
    if mad == 0.0 {
        return vec![0.0; values.len()];
    }
    let med = median(values);
    values.iter().map(|v| 0.6745 * (v - med) / mad).collect()
}

/// Flags values outside `[Q1 − k·IQR, Q3 + k·IQR]`.
///
/// The conventional multiplier is 1.5.
pub fn iqr_outliers(values: &[f64], multiplier: f64) -> Vec<bool> {
    if values.is_empty() {
        return Vec::new();
    }
    let q1 = percentile(values, 25.0);
    let q3 = percentile(values, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;
    values.iter().map(|v| *v < lower || *v > upper).collect()
}
