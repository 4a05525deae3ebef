//! Per-file churn series
//!
//! History is cut into fixed windows (`window_weeks`) from the oldest commit.
//! Each analyzed file gets its change count per window plus:
//! - slope and coefficient of variation → trajectory
//! - author entropy and bus factor (`2^H`)
//! - share of fix / refactor commits
//! - entropy of changes across windows

use std::collections::{BTreeMap, BTreeSet};

use super::models::{ChurnSeries, GitHistory, Trajectory};
use crate::math::entropy::shannon_counts;

const FIX_KEYWORDS: &[&str] = &["fix", "bug", "patch", "hotfix", "bugfix", "repair", "issue"];
const REFACTOR_KEYWORDS: &[&str] = &["refactor", "cleanup", "clean up", "reorganize", "restructure", "rename"];

/// Minimum |slope| counted as a trend.
const SLOPE_THRESHOLD: f64 = 0.1;
/// CV separating steady from erratic change.
const CV_THRESHOLD: f64 = 0.5;

#[derive(Default)]
struct FileTally {
    windows: Vec<usize>,
    authors: BTreeMap<String, usize>,
    commits: usize,
    fixes: usize,
    refactors: usize,
}

/// Churn series for every analyzed file touched by at least one commit.
pub fn build_churn_series(
    history: &GitHistory,
    analyzed_files: &BTreeSet<String>,
    window_weeks: u32,
) -> BTreeMap<String, ChurnSeries> {
    let window_secs = i64::from(window_weeks) * 7 * 86_400;
    let (Some(min_ts), Some(max_ts)) = (
        history.commits.iter().map(|c| c.timestamp).min(),
        history.commits.iter().map(|c| c.timestamp).max(),
    ) else {
        return BTreeMap::new();
    };
    if window_secs == 0 {
        return BTreeMap::new();
    }
    let num_windows = ((max_ts - min_ts) / window_secs + 1).max(1) as usize;

    let mut tallies: BTreeMap<&str, FileTally> = BTreeMap::new();
    for commit in &history.commits {
        let window = (((commit.timestamp - min_ts) / window_secs) as usize).min(num_windows - 1);
        let subject = commit.subject.to_lowercase();
        let is_fix = FIX_KEYWORDS.iter().any(|k| subject.contains(k));
        let is_refactor = REFACTOR_KEYWORDS.iter().any(|k| subject.contains(k));

        for file in commit.files.iter().filter(|f| analyzed_files.contains(*f)) {
            let tally = tallies.entry(file.as_str()).or_insert_with(|| FileTally {
                windows: vec![0; num_windows],
                ..Default::default()
            });
            tally.windows[window] += 1;
            *tally.authors.entry(commit.author.clone()).or_insert(0) += 1;
            tally.commits += 1;
            tally.fixes += usize::from(is_fix);
            tally.refactors += usize::from(is_refactor);
        }
    }

    tallies
        .into_iter()
        .map(|(path, tally)| {
            let total: usize = tally.windows.iter().sum();
            let slope = linear_slope(&tally.windows);
            let cv = coefficient_of_variation(&tally.windows, total);
            let author_entropy = shannon_counts(tally.authors.values().map(|&c| c as f64));
            let ratio = |n: usize| if tally.commits > 0 { n as f64 / tally.commits as f64 } else { 0.0 };
            let series = ChurnSeries {
                file_path: path.to_string(),
                total_changes: total,
                trajectory: classify_trajectory(total, slope, cv),
                slope,
                cv,
                bus_factor: 2f64.powf(author_entropy),
                author_entropy,
                fix_ratio: ratio(tally.fixes),
                refactor_ratio: ratio(tally.refactors),
                change_entropy: shannon_counts(tally.windows.iter().map(|&c| c as f64)),
                window_counts: tally.windows,
                author_commits: tally.authors,
            };
            (path.to_string(), series)
        })
        .collect()
}

/// Least-squares slope over indices 0..n.
pub fn linear_slope(values: &[usize]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<usize>() as f64 / n as f64;
    let (num, den) = values.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, &v)| {
        let dx = i as f64 - x_mean;
        (num + dx * (v as f64 - y_mean), den + dx * dx)
    });
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Population CV. 0 for a single window or no changes.
fn coefficient_of_variation(counts: &[usize], total: usize) -> f64 {
    let n = counts.len();
    if n < 2 || total == 0 {
        return 0.0;
    }
    let mean = total as f64 / n as f64;
    let variance = counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / n as f64;
    variance.sqrt() / mean
}

/// Trajectory from total changes, slope and CV. First matching rule wins.
pub fn classify_trajectory(total: usize, slope: f64, cv: f64) -> Trajectory {
    if total <= 1 || cv == 0.0 {
        Trajectory::Dormant
    } else if slope < -SLOPE_THRESHOLD && cv < CV_THRESHOLD {
        Trajectory::Stabilizing
    } else if slope > SLOPE_THRESHOLD && cv > CV_THRESHOLD {
        Trajectory::Spiking
    } else if cv > CV_THRESHOLD {
        Trajectory::Churning
    } else {
        Trajectory::Stable
    }
}
