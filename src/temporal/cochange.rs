use std::collections::{BTreeMap, BTreeSet};

use super::models::{CoChangeMatrix, CoChangePair, GitHistory};

/// Sparse co-change matrix over analyzed files.
///
/// Commits touching more than `max_files_per_commit` analyzed files are
/// bulk changes (reformats, renames) and are ignored. Pairs co-changing
/// fewer than `min_cochanges` times are dropped.
pub fn build_cochange_matrix(
    history: &GitHistory,
    analyzed_files: &BTreeSet<String>,
    min_cochanges: usize,
    max_files_per_commit: usize,
) -> CoChangeMatrix {
    let mut file_change_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut pair_counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();

    for commit in &history.commits {
        let relevant: BTreeSet<&str> = commit
            .files
            .iter()
            .filter(|f| analyzed_files.contains(*f))
            .map(String::as_str)
            .collect();
        if relevant.is_empty() || relevant.len() > max_files_per_commit {
            continue;
        }
        for f in &relevant {
            *file_change_counts.entry(f.to_string()).or_insert(0) += 1;
        }
        let sorted: Vec<&str> = relevant.into_iter().collect();
        for (i, a) in sorted.iter().enumerate() {
            for b in &sorted[i + 1..] {
                *pair_counts.entry((*a, *b)).or_insert(0) += 1;
            }
        }
    }

    let total_commits = history.total_commits();
    let pairs = pair_counts
        .into_iter()
        .filter(|(_, count)| *count >= min_cochanges)
        .map(|((a, b), count)| {
            let total_a = file_change_counts.get(a).copied().unwrap_or(0);
            let total_b = file_change_counts.get(b).copied().unwrap_or(0);
            let confidence = |total: usize| if total > 0 { count as f64 / total as f64 } else { 0.0 };
            let expected = if total_commits > 0 {
                (total_a * total_b) as f64 / total_commits as f64
            } else {
                0.0
            };
            let pair = CoChangePair {
                file_a: a.to_string(),
                file_b: b.to_string(),
                cochange_count: count,
                total_a,
                total_b,
                confidence_a_b: confidence(total_a),
                confidence_b_a: confidence(total_b),
                lift: if expected > 0.0 { count as f64 / expected } else { 0.0 },
            };
            ((a.to_string(), b.to_string()), pair)
        })
        .collect();

    CoChangeMatrix {
        pairs,
        total_commits,
        file_change_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::models::Commit;

    fn commit(files: &[&str]) -> Commit {
        Commit {
            files: files.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    fn analyzed(files: &[&str]) -> BTreeSet<String> {
        files.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_pairs_confidence_and_lift() {
        let history = GitHistory::from_commits(vec![
            commit(&["a", "b"]),
            commit(&["b", "a"]),
            commit(&["a"]),
            commit(&["c"]),
        ]);
        let m = build_cochange_matrix(&history, &analyzed(&["a", "b", "c"]), 2, 50);
        assert_eq!(m.pairs.len(), 1);
        let p = m.pair("b", "a").unwrap();
        assert_eq!(p.cochange_count, 2);
        assert!((p.confidence_a_b - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(p.confidence_b_a, 1.0);
        // expected = 3 * 2 / 4 = 1.5
        assert!((p.lift - 2.0 / 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_bulk_commits_and_min_count_filtered() {
        let history = GitHistory::from_commits(vec![commit(&["a", "b", "c"]), commit(&["a", "b"])]);
        let m = build_cochange_matrix(&history, &analyzed(&["a", "b", "c"]), 1, 2);
        assert_eq!(m.pairs.len(), 1);
        assert_eq!(m.file_change_counts.get("c"), None);

        let m = build_cochange_matrix(&history, &analyzed(&["a", "b", "c"]), 3, 50);
        assert!(m.pairs.is_empty());
    }
}
