use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// One commit as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Commit {
    pub hash: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub author: String,
    /// Repository-relative paths touched by the commit.
    pub files: Vec<String>,
    pub subject: String,
}

/// Commit history of the analyzed repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GitHistory {
    /// Newest first.
    pub commits: Vec<Commit>,
    pub file_set: BTreeSet<String>,
    pub span_days: i64,
}

impl GitHistory {
    /// Derives the file set and span from `commits` (newest first).
    pub fn from_commits(commits: Vec<Commit>) -> Self {
        let file_set = commits.iter().flat_map(|c| c.files.iter().cloned()).collect();
        let span_days = match (commits.iter().map(|c| c.timestamp).max(), commits.iter().map(|c| c.timestamp).min()) {
            (Some(newest), Some(oldest)) if commits.len() >= 2 => ((newest - oldest) / 86_400).max(1),
            _ => 0,
        };
        Self {
            commits,
            file_set,
            span_days,
        }
    }

    pub fn total_commits(&self) -> usize {
        self.commits.len()
    }

    pub fn authors(&self) -> BTreeSet<&str> {
        self.commits.iter().map(|c| c.author.as_str()).collect()
    }
}

/// Shape of a file's change history over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trajectory {
    #[default]
    Dormant,
    Stabilizing,
    Stable,
    Churning,
    Spiking,
}

impl Trajectory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trajectory::Dormant => "DORMANT",
            Trajectory::Stabilizing => "STABILIZING",
            Trajectory::Stable => "STABLE",
            Trajectory::Churning => "CHURNING",
            Trajectory::Spiking => "SPIKING",
        }
    }

    /// Erratic change patterns.
    pub fn is_volatile(&self) -> bool {
        matches!(self, Trajectory::Churning | Trajectory::Spiking)
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trajectory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DORMANT" => Ok(Trajectory::Dormant),
            "STABILIZING" => Ok(Trajectory::Stabilizing),
            "STABLE" => Ok(Trajectory::Stable),
            "CHURNING" => Ok(Trajectory::Churning),
            "SPIKING" => Ok(Trajectory::Spiking),
            other => Err(format!("unknown trajectory: {other}")),
        }
    }
}

/// Per-file change time series and derived temporal signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChurnSeries {
    pub file_path: String,
    pub window_counts: Vec<usize>,
    pub total_changes: usize,
    pub trajectory: Trajectory,
    /// Least-squares slope of the window counts.
    pub slope: f64,
    /// Coefficient of variation of the window counts.
    pub cv: f64,
    /// `2^author_entropy`: effective number of authors.
    pub bus_factor: f64,
    pub author_entropy: f64,
    pub fix_ratio: f64,
    pub refactor_ratio: f64,
    /// Entropy of changes across windows.
    pub change_entropy: f64,
    /// Commits per author.
    pub author_commits: BTreeMap<String, usize>,
}

/// Two files changing in the same commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CoChangePair {
    pub file_a: String,
    pub file_b: String,
    pub cochange_count: usize,
    pub total_a: usize,
    pub total_b: usize,
    /// P(B changed | A changed)
    pub confidence_a_b: f64,
    /// P(A changed | B changed)
    pub confidence_b_a: f64,
    /// Observed over expected co-changes under independence.
    pub lift: f64,
}

/// Sparse co-change counts keyed by `(file_a, file_b)` with `file_a < file_b`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoChangeMatrix {
    pub pairs: BTreeMap<(String, String), CoChangePair>,
    pub total_commits: usize,
    pub file_change_counts: BTreeMap<String, usize>,
}

impl CoChangeMatrix {
    /// Pair lookup in either order.
    pub fn pair(&self, a: &str, b: &str) -> Option<&CoChangePair> {
        let key = if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        self.pairs.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trajectory_strings() {
        assert_eq!(serde_json::to_string(&Trajectory::Churning).unwrap(), "\"CHURNING\"");
        assert_eq!("spiking".parse::<Trajectory>().unwrap(), Trajectory::Spiking);
        assert!("wobbly".parse::<Trajectory>().is_err());
        assert!(Trajectory::Spiking.is_volatile());
        assert!(!Trajectory::Stable.is_volatile());
    }

    #[test]
    fn test_history_span() {
        let commit = |ts: i64, files: &[&str]| Commit {
            timestamp: ts,
            files: files.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        };
        let h = GitHistory::from_commits(vec![commit(10 * 86_400, &["a"]), commit(0, &["b"])]);
        assert_eq!(h.span_days, 10);
        assert_eq!(h.file_set.len(), 2);
        assert_eq!(GitHistory::from_commits(vec![commit(5, &["a"])]).span_days, 0);
    }
}
