//! Information theory: Shannon entropy, KL divergence, pooled entropy
//!
//! Distributions are count maps (`event -> count`). Counts need not be
//! normalized; every function divides by the total itself.

use std::collections::BTreeMap;

/// Shannon entropy `H(X) = -Σ p(x) log₂ p(x)` in bits over raw counts.
///
/// Returns 0 for an empty or all-zero distribution.
pub fn shannon_counts<I>(counts: I) -> f64
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let iter = counts.into_iter();
    let total: f64 = iter.clone().sum();
    if total <= 0.0 {
        return 0.0;
    }

    let mut entropy = 0.0;
    for count in iter {
        let p = count / total;
        if p > 0.0 {
            entropy -= p * p.log2();
        }
    }
    // -0.0 for single-outcome distributions
    entropy.max(0.0)
}

/// Shannon entropy of a keyed distribution.
pub fn shannon<K>(distribution: &BTreeMap<K, f64>) -> f64 {
    shannon_counts(distribution.values().copied())
}

/// Entropy divided by `log₂(n)` where `n` is the number of events.
pub fn normalized<K>(distribution: &BTreeMap<K, f64>) -> f64 {
    let n = distribution.len();
    if n <= 1 {
        return 0.0;
    }
    let max_h = (n as f64).log2();
    if max_h > 0.0 {
        shannon(distribution) / max_h
    } else {
        0.0
    }
}

/// Kullback-Leibler divergence `D_KL(P || Q)` in bits.
///
/// Infinite when some event has `P(x) > 0` and `Q(x) = 0`. Zero when either
/// distribution has no mass.
pub fn kl_divergence<K: Ord>(p: &BTreeMap<K, f64>, q: &BTreeMap<K, f64>) -> f64 {
    let total_p: f64 = p.values().sum();
    let total_q: f64 = q.values().sum();
    if total_p <= 0.0 || total_q <= 0.0 {
        return 0.0;
    }

    let mut divergence = 0.0;
    for (key, count_p) in p {
        let prob_p = count_p / total_p;
        let prob_q = q.get(key).copied().unwrap_or(0.0) / total_q;
        if prob_p > 0.0 && prob_q == 0.0 {
            return f64::INFINITY;
        }
        if prob_p > 0.0 {
            divergence += prob_p * (prob_p / prob_q).log2();
        }
    }
    divergence
}

/// Joint entropy over tuple-keyed outcomes. Same formula, joint sample space.
pub fn joint_entropy<K>(joint: &BTreeMap<K, f64>) -> f64 {
    shannon(joint)
}

/// Entropy of the merged sample of several distributions.
///
/// Not the joint entropy: counts for the same key are summed into a single
/// mixture distribution first.
pub fn pooled<K: Ord + Clone>(distributions: &[&BTreeMap<K, f64>]) -> f64 {
    let mut merged: BTreeMap<K, f64> = BTreeMap::new();
    for dist in distributions {
        for (key, count) in dist.iter() {
            *merged.entry(key.clone()).or_insert(0.0) += count;
        }
    }
    shannon(&merged)
}

/// Mutual information (bits) of two binary events from a 2x2 contingency table.
///
/// `joint` = both changed, `only_a` / `only_b` = one changed, `neither` = none.
pub fn mutual_information(joint: f64, only_a: f64, only_b: f64, neither: f64) -> f64 {
    let total = joint + only_a + only_b + neither;
    if total <= 0.0 {
        return 0.0;
    }
    let h_a = shannon_counts([joint + only_a, only_b + neither]);
    let h_b = shannon_counts([joint + only_b, only_a + neither]);
    let h_ab = shannon_counts([joint, only_a, only_b, neither]);
    (h_a + h_b - h_ab).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn dist(pairs: &[(&'static str, f64)]) -> BTreeMap<&'static str, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_single_outcome_is_zero() {
        assert_eq!(shannon(&dist(&[("a", 42.0)])), 0.0);
    }

    #[test]
    fn test_uniform_is_log2_n() {
        for n in 2..10usize {
            let d: BTreeMap<usize, f64> = (0..n).map(|i| (i, 3.0)).collect();
            assert!((shannon(&d) - (n as f64).log2()).abs() < EPSILON);
            assert!((normalized(&d) - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_empty_distribution() {
        let d: BTreeMap<&str, f64> = BTreeMap::new();
        assert_eq!(shannon(&d), 0.0);
        assert_eq!(normalized(&d), 0.0);
    }

    #[test]
    fn test_kl_infinite_when_q_missing_support() {
        let p = dist(&[("a", 1.0), ("b", 1.0)]);
        let q = dist(&[("a", 1.0)]);
        assert!(kl_divergence(&p, &q).is_infinite());
    }

    #[test]
    fn test_kl_identical_is_zero() {
        let p = dist(&[("a", 2.0), ("b", 6.0)]);
        assert!(kl_divergence(&p, &p).abs() < EPSILON);
    }

    #[test]
    fn test_pooled_merges_counts() {
        let a = dist(&[("alice", 4.0)]);
        let b = dist(&[("bob", 4.0)]);
        assert!((pooled(&[&a, &b]) - 1.0).abs() < EPSILON);
        assert_eq!(pooled(&[&a, &a]), 0.0);
    }

    #[test]
    fn test_mutual_information_independent_vs_coupled() {
        // Always change together: one full bit shared
        let coupled = mutual_information(5.0, 0.0, 0.0, 5.0);
        assert!((coupled - 1.0).abs() < EPSILON);
        // Independent events
        let independent = mutual_information(1.0, 1.0, 1.0, 1.0);
        assert!(independent.abs() < EPSILON);
    }
}
