//! Pairwise author distance
//!
//! Each file has an author share distribution (commits by author / commits
//! on the file). Two files sharing authors are close when the same people
//! carry most of their history:
//!
//! `distance = 1 − Σ_{shared authors} min(share_a, share_b)`
//!
//! Candidate pairs come from an author → files index, so files with no
//! common author are never compared and never returned.

use std::collections::{BTreeMap, BTreeSet};

use super::model::AuthorDistance;
use crate::temporal::GitHistory;

/// Distances for every file pair sharing at least one author, sorted by pair.
///
/// Solo projects (fewer than two distinct authors) return nothing.
pub fn compute_author_distances(history: &GitHistory, analyzed_files: &BTreeSet<String>) -> Vec<AuthorDistance> {
    if history.authors().len() < 2 {
        return Vec::new();
    }

    let mut counts: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    for commit in &history.commits {
        for file in commit.files.iter().filter(|f| analyzed_files.contains(*f)) {
            *counts
                .entry(file.as_str())
                .or_default()
                .entry(commit.author.as_str())
                .or_insert(0) += 1;
        }
    }

    let shares: BTreeMap<&str, BTreeMap<&str, f64>> = counts
        .iter()
        .map(|(file, by_author)| {
            let total: usize = by_author.values().sum();
            let dist = by_author
                .iter()
                .map(|(author, c)| (*author, *c as f64 / total as f64))
                .collect();
            (*file, dist)
        })
        .collect();

    let mut author_files: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (file, dist) in &shares {
        for author in dist.keys() {
            author_files.entry(*author).or_default().insert(*file);
        }
    }

    let mut candidates: BTreeSet<(&str, &str)> = BTreeSet::new();
    for files in author_files.values() {
        let files: Vec<&str> = files.iter().copied().collect();
        for (i, a) in files.iter().enumerate() {
            for b in &files[i + 1..] {
                candidates.insert((*a, *b));
            }
        }
    }

    candidates
        .into_iter()
        .map(|(a, b)| {
            let (sa, sb) = (&shares[a], &shares[b]);
            let shared: Vec<&str> = sa.keys().filter(|k| sb.contains_key(*k)).copied().collect();
            let overlap: f64 = shared.iter().map(|k| sa[k].min(sb[k])).sum();
            AuthorDistance {
                file_a: a.to_string(),
                file_b: b.to_string(),
                distance: (1.0 - overlap).clamp(0.0, 1.0),
                shared_authors: shared.iter().map(|s| s.to_string()).collect(),
            }
        })
        .collect()
}
