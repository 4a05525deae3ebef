// Percentile normalization
//
// FULL tier: fraction of values <= v (bisect right).
// BAYESIAN tier: (k + α/2) / (N + α), which pulls small samples toward the
// middle. ABSOLUTE tier computes nothing.
//
// Floors keep tiny absolute values from ranking high in codebases where
// everything is small.

use std::collections::BTreeMap;

use super::models::{SignalField, Tier};
use super::registry::{registry, Signal, SignalScope};

/// Below these raw values a file's percentile is forced to 0.
pub const PERCENTILE_FLOORS: &[(Signal, f64)] = &[
    (Signal::Pagerank, 0.005),
    (Signal::BlastRadiusSize, 5.0),
    (Signal::CognitiveLoad, 10.0),
    (Signal::Lines, 100.0),
];

fn floor_of(signal: Signal) -> Option<f64> {
    PERCENTILE_FLOORS.iter().find(|(s, _)| *s == signal).map(|(_, f)| *f)
}

/// Number of values `<= v` in an ascending slice.
fn count_at_or_below(sorted: &[f64], v: f64) -> usize {
    sorted.partition_point(|x| *x <= v)
}

/// Percentile of `v` within `sorted` for the given tier.
pub fn percentile(sorted: &[f64], v: f64, tier: Tier, prior_strength: f64) -> f64 {
    let n = sorted.len() as f64;
    if sorted.is_empty() {
        return 0.0;
    }
    let k = count_at_or_below(sorted, v) as f64;
    match tier {
        Tier::Absolute => 0.0,
        Tier::Full => k / n,
        Tier::Bayesian => (k + prior_strength * 0.5) / (n + prior_strength),
    }
}

/// Fills `percentiles` on every file and module for each percentileable
/// signal of their scope.
pub fn normalize(field: &mut SignalField, prior_strength: f64) {
    let tier = field.tier;
    if tier == Tier::Absolute {
        return;
    }

    for signal in registry().percentileable(SignalScope::File) {
        let mut values: Vec<f64> = field.per_file.values().filter_map(|f| f.numeric(signal)).collect();
        if values.is_empty() {
            continue;
        }
        values.sort_by(f64::total_cmp);
        let floor = floor_of(signal);
        for fs in field.per_file.values_mut() {
            let Some(v) = fs.numeric(signal) else {
                continue;
            };
            let pctl = match floor {
                Some(f) if v < f => 0.0,
                _ => percentile(&values, v, tier, prior_strength),
            };
            fs.percentiles.insert(signal, pctl);
        }
    }

    for signal in registry().percentileable(SignalScope::Module) {
        let mut values: Vec<f64> = field.per_module.values().filter_map(|m| m.numeric(signal)).collect();
        if values.is_empty() {
            continue;
        }
        values.sort_by(f64::total_cmp);
        let computed: BTreeMap<String, f64> = field
            .per_module
            .iter()
            .filter_map(|(p, m)| m.numeric(signal).map(|v| (p.clone(), percentile(&values, v, tier, prior_strength))))
            .collect();
        for (path, pctl) in computed {
            if let Some(m) = field.per_module.get_mut(&path) {
                m.percentiles.insert(signal, pctl);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::models::FileSignals;

    fn field(tier: Tier, pageranks: &[f64]) -> SignalField {
        let mut f = SignalField {
            tier,
            ..Default::default()
        };
        for (i, pr) in pageranks.iter().enumerate() {
            let mut fs = FileSignals::new(format!("f{i:02}"));
            fs.pagerank = *pr;
            fs.lines = 200 + i;
            f.per_file.insert(fs.path.clone(), fs);
        }
        f
    }

    #[test]
    fn test_full_tier_bisect_right() {
        let sorted = [1.0, 2.0, 2.0, 3.0];
        assert_eq!(percentile(&sorted, 2.0, Tier::Full, 2.0), 0.75);
        assert_eq!(percentile(&sorted, 3.0, Tier::Full, 2.0), 1.0);
        assert_eq!(percentile(&sorted, 0.5, Tier::Full, 2.0), 0.0);
    }

    #[test]
    fn test_bayesian_tier_is_smoothed() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        // (4 + 1) / (4 + 2)
        assert!((percentile(&sorted, 4.0, Tier::Bayesian, 2.0) - 5.0 / 6.0).abs() < 1e-12);
        // (0 + 1) / 6: never reaches 0
        assert!((percentile(&sorted, 0.0, Tier::Bayesian, 2.0) - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_absolute_tier_has_no_percentiles() {
        let mut f = field(Tier::Absolute, &[0.1, 0.2, 0.3]);
        normalize(&mut f, 2.0);
        assert!(f.per_file.values().all(|fs| fs.percentiles.is_empty()));
    }

    #[test]
    fn test_floor_forces_zero() {
        let mut prs = vec![0.001; 10];
        prs.extend([0.05; 40]);
        let mut f = field(Tier::Full, &prs);
        normalize(&mut f, 2.0);
        assert_eq!(f.per_file["f00"].percentile(Signal::Pagerank), Some(0.0));
        assert_eq!(f.per_file["f49"].percentile(Signal::Pagerank), Some(1.0));
        // non-percentileable signals are skipped
        assert_eq!(f.per_file["f00"].percentile(Signal::Depth), None);
    }
}
