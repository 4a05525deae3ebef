//! Tier-aware threshold checks shared by finders
//!
//! In the ABSOLUTE tier there are no percentiles, so a percentile check
//! falls back to the signal's registered absolute threshold; a signal with
//! none cannot fire there. In the other tiers the percentile is compared.

use crate::signals::{registry, FileSignals, Polarity, Signal, SignalField, Tier};

#[derive(Debug, Clone, Copy)]
pub struct ThresholdCheck {
    tier: Tier,
}

impl ThresholdCheck {
    pub fn new(tier: Tier) -> Self {
        Self { tier }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Percentile above `pctl_threshold` (missing counts as 0).
    pub fn above(&self, fs: &FileSignals, signal: Signal, pctl_threshold: f64) -> bool {
        if self.tier == Tier::Absolute {
            return match (registry().absolute_threshold(signal), fs.numeric(signal)) {
                (Some(t), Some(v)) => v > t,
                _ => false,
            };
        }
        fs.percentile(signal).unwrap_or(0.0) > pctl_threshold
    }

    /// Percentile below `pctl_threshold` (missing counts as 1).
    pub fn below(&self, fs: &FileSignals, signal: Signal, pctl_threshold: f64) -> bool {
        if self.tier == Tier::Absolute {
            return match (registry().absolute_threshold(signal), fs.numeric(signal)) {
                (Some(t), Some(v)) => v < t,
                _ => false,
            };
        }
        fs.percentile(signal).unwrap_or(1.0) < pctl_threshold
    }

    pub fn above_raw(&self, fs: &FileSignals, signal: Signal, value: f64) -> bool {
        fs.numeric(signal).is_some_and(|v| v > value)
    }

    pub fn below_raw(&self, fs: &FileSignals, signal: Signal, value: f64) -> bool {
        fs.numeric(signal).is_some_and(|v| v < value)
    }
}

/// Lower median of nonzero `total_changes` over non-test files; 0 when no
/// file has changed.
pub fn compute_hotspot_median(field: &SignalField) -> f64 {
    let mut changes: Vec<usize> = field
        .per_file
        .values()
        .filter(|f| f.role != crate::semantics::Role::Test && f.total_changes > 0)
        .map(|f| f.total_changes)
        .collect();
    if changes.is_empty() {
        return 0.0;
    }
    changes.sort_unstable();
    let n = changes.len();
    let idx = if n % 2 == 1 { n / 2 } else { n / 2 - 1 };
    changes[idx] as f64
}

pub fn is_hotspot(fs: &FileSignals, median: f64) -> bool {
    fs.total_changes as f64 > median
}

/// One triggered condition: how far `actual` cleared `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct Margin {
    pub actual: f64,
    pub threshold: f64,
    pub polarity: Polarity,
}

impl Margin {
    pub fn new(actual: f64, threshold: f64, polarity: Polarity) -> Self {
        Self {
            actual,
            threshold,
            polarity,
        }
    }

    fn value(&self) -> f64 {
        let (a, t) = (self.actual, self.threshold);
        let m = match self.polarity {
            Polarity::HighIsGood => {
                if t > 0.0 {
                    (t - a) / t
                } else {
                    0.0
                }
            }
            _ => {
                if t < 1.0 {
                    (a - t) / (1.0 - t)
                } else {
                    0.0
                }
            }
        };
        m.clamp(0.0, 1.0)
    }
}

/// Mean clamped margin; 0 without margins.
pub fn compute_confidence(margins: &[Margin]) -> f64 {
    if margins.is_empty() {
        return 0.0;
    }
    margins.iter().map(Margin::value).sum::<f64>() / margins.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, changes: usize) -> FileSignals {
        let mut f = FileSignals::new(path);
        f.total_changes = changes;
        f
    }

    #[test]
    fn test_absolute_tier_uses_registered_threshold() {
        let check = ThresholdCheck::new(Tier::Absolute);
        let mut f = file("a", 0);
        f.lines = 800;
        f.pagerank = 0.9;
        assert!(check.above(&f, Signal::Lines, 0.9));
        // pagerank has no absolute threshold
        assert!(!check.above(&f, Signal::Pagerank, 0.1));
        assert!(!check.below(&f, Signal::Pagerank, 0.9));
    }

    #[test]
    fn test_percentile_tiers() {
        let check = ThresholdCheck::new(Tier::Full);
        let mut f = file("a", 0);
        f.percentiles.insert(Signal::CognitiveLoad, 0.95);
        assert!(check.above(&f, Signal::CognitiveLoad, 0.9));
        assert!(!check.above(&f, Signal::Pagerank, 0.0));
        assert!(!check.below(&f, Signal::SemanticCoherence, 1.0));
        assert!(check.below(&f, Signal::SemanticCoherence, 1.01));
        assert!(check.above_raw(&f, Signal::TotalChanges, -1.0));
        assert!(!check.below_raw(&f, Signal::DocstringCoverage, 1.0));
    }

    #[test]
    fn test_hotspot_median_is_lower_median() {
        let mut field = SignalField::default();
        for (p, c) in [("a", 0), ("b", 2), ("c", 4), ("d", 6), ("e", 8)] {
            field.per_file.insert(p.into(), file(p, c));
        }
        // nonzero [2, 4, 6, 8] → lower median 4
        assert_eq!(compute_hotspot_median(&field), 4.0);
        let mut test_file = file("t", 100);
        test_file.role = crate::semantics::Role::Test;
        field.per_file.insert("t".into(), test_file);
        assert_eq!(compute_hotspot_median(&field), 4.0);
        assert!(is_hotspot(&field.per_file["d"], 4.0));
        assert_eq!(compute_hotspot_median(&SignalField::default()), 0.0);
    }

    #[test]
    fn test_confidence_from_margins() {
        assert_eq!(compute_confidence(&[]), 0.0);
        let c = compute_confidence(&[
            Margin::new(0.95, 0.9, Polarity::HighIsBad),
            Margin::new(0.1, 0.3, Polarity::HighIsGood),
        ]);
        // (0.5 + 2/3) / 2
        assert!((c - (0.5 + 2.0 / 3.0) / 2.0).abs() < 1e-9);
        assert_eq!(compute_confidence(&[Margin::new(5.0, 1.0, Polarity::HighIsBad)]), 0.0);
    }
}
