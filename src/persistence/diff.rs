//! Snapshot diffing
//!
//! Three passes over an (old, new) pair:
//! 1. findings matched by identity key: new / resolved / worsened / improved
//! 2. per-file and per-module signal deltas, tagged better / worse by the
//!    signal's registered polarity
//! 3. codebase (global) signal deltas
//!
//! An optional rename map rewrites the old snapshot's paths first, so a
//! renamed file is compared with itself instead of showing up as one
//! removal plus one addition.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::compute_identity_key;
use super::models::{FindingRecord, Snapshot};
use crate::signals::{polarity_of, Polarity};

/// Severity change below this is noise.
pub const SEVERITY_THRESHOLD: f64 = 0.01;
pub const DEFAULT_METRIC_THRESHOLD: f64 = 0.01;
const DIRECTION_EPSILON: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Better,
    Worse,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub old_value: f64,
    pub new_value: f64,
    /// new - old
    pub delta: f64,
    pub direction: Direction,
}

impl MetricDelta {
    fn new(metric: &str, old_value: f64, new_value: f64) -> Self {
        let delta = new_value - old_value;
        Self {
            old_value,
            new_value,
            delta,
            direction: classify_direction(metric, delta),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Worsened,
    Improved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingDelta {
    pub status: FindingStatus,
    /// The finding as it appears in the new snapshot.
    pub finding: FindingRecord,
    pub old_severity: f64,
    pub new_severity: f64,
    pub severity_delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    New,
    Removed,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDelta {
    pub path: String,
    pub status: FileStatus,
    pub metric_deltas: BTreeMap<String, MetricDelta>,
}

impl FileDelta {
    fn count(&self, direction: Direction) -> usize {
        self.metric_deltas.values().filter(|d| d.direction == direction).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub old_commit: Option<String>,
    pub new_commit: Option<String>,
    pub old_timestamp: DateTime<Utc>,
    pub new_timestamp: DateTime<Utc>,

    pub new_findings: Vec<FindingRecord>,
    pub resolved_findings: Vec<FindingRecord>,
    pub worsened_findings: Vec<FindingDelta>,
    pub improved_findings: Vec<FindingDelta>,

    pub file_deltas: Vec<FileDelta>,
    /// module -> signal -> delta, for modules present on both sides
    pub module_deltas: BTreeMap<String, BTreeMap<String, MetricDelta>>,
    pub codebase_deltas: BTreeMap<String, MetricDelta>,

    /// |new findings| - |resolved findings|
    pub debt_velocity: i64,
    /// Changed files with more better than worse deltas.
    pub improving_files: Vec<String>,
    pub worsening_files: Vec<String>,
    /// (old path, new path)
    pub renames: Vec<(String, String)>,
}

/// Better / worse / neutral for a change of `delta` in `metric`.
pub fn classify_direction(metric: &str, delta: f64) -> Direction {
    if delta.abs() < DIRECTION_EPSILON {
        return Direction::Neutral;
    }
    match polarity_of(metric) {
        Polarity::HighIsBad if delta < 0.0 => Direction::Better,
        Polarity::HighIsBad => Direction::Worse,
        Polarity::HighIsGood if delta > 0.0 => Direction::Better,
        Polarity::HighIsGood => Direction::Worse,
        Polarity::Neutral => Direction::Neutral,
    }
}

pub fn diff_snapshots(
    old: &Snapshot,
    new: &Snapshot,
    renames: &BTreeMap<String, String>,
    metric_threshold: f64,
) -> SnapshotDiff {
    let rename = |p: &String| renames.get(p).cloned().unwrap_or_else(|| p.clone());

    let old_file_signals: BTreeMap<String, BTreeMap<String, f64>> =
        old.file_signals.iter().map(|(p, s)| (rename(p), s.clone())).collect();
    let old_findings: Vec<FindingRecord> = if renames.is_empty() {
        old.findings.clone()
    } else {
        old.findings.iter().map(|f| renamed_finding(f, &rename)).collect()
    };

    let (new_findings, resolved_findings, worsened_findings, improved_findings) =
        diff_findings(&old_findings, &new.findings);

    let file_deltas = diff_file_signals(&old_file_signals, &new.file_signals, metric_threshold);
    let mut improving_files = Vec::new();
    let mut worsening_files = Vec::new();
    for fd in file_deltas.iter().filter(|d| d.status == FileStatus::Changed) {
        let (better, worse) = (fd.count(Direction::Better), fd.count(Direction::Worse));
        if better > worse {
            improving_files.push(fd.path.clone());
        } else if worse > better {
            worsening_files.push(fd.path.clone());
        }
    }

    let module_deltas = old
        .module_signals
        .iter()
        .filter_map(|(module, old_sigs)| {
            let new_sigs = new.module_signals.get(module)?;
            let deltas = diff_metrics(old_sigs, new_sigs, Some(metric_threshold));
            (!deltas.is_empty()).then(|| (module.clone(), deltas))
        })
        .collect();

    let debt_velocity = new_findings.len() as i64 - resolved_findings.len() as i64;

    SnapshotDiff {
        old_commit: old.commit_sha.clone(),
        new_commit: new.commit_sha.clone(),
        old_timestamp: old.timestamp,
        new_timestamp: new.timestamp,
        new_findings,
        resolved_findings,
        worsened_findings,
        improved_findings,
        file_deltas,
        module_deltas,
        codebase_deltas: diff_metrics(&old.global_signals, &new.global_signals, None),
        debt_velocity,
        improving_files,
        worsening_files,
        renames: renames.iter().map(|(a, b)| (a.clone(), b.clone())).collect(),
    }
}

// identity is recomputed so renamed targets line up with the new snapshot
fn renamed_finding(record: &FindingRecord, rename: &impl Fn(&String) -> String) -> FindingRecord {
    let mut finding = record.finding.clone();
    finding.files = finding.files.iter().map(rename).collect();
    FindingRecord {
        identity_key: compute_identity_key(&finding.finding_type, &finding.files),
        finding,
    }
}

type FindingBuckets = (Vec<FindingRecord>, Vec<FindingRecord>, Vec<FindingDelta>, Vec<FindingDelta>);

fn diff_findings(old: &[FindingRecord], new: &[FindingRecord]) -> FindingBuckets {
    let old_by_key: BTreeMap<&str, &FindingRecord> = old.iter().map(|f| (f.identity_key.as_str(), f)).collect();
    let new_by_key: BTreeMap<&str, &FindingRecord> = new.iter().map(|f| (f.identity_key.as_str(), f)).collect();

    let added = new_by_key
        .iter()
        .filter(|(k, _)| !old_by_key.contains_key(*k))
        .map(|(_, f)| (*f).clone())
        .collect();
    let resolved = old_by_key
        .iter()
        .filter(|(k, _)| !new_by_key.contains_key(*k))
        .map(|(_, f)| (*f).clone())
        .collect();

    let mut worsened = Vec::new();
    let mut improved = Vec::new();
    for (key, new_f) in &new_by_key {
        let Some(old_f) = old_by_key.get(key) else {
            continue;
        };
        let delta = new_f.severity() - old_f.severity();
        let status = if delta > SEVERITY_THRESHOLD {
            FindingStatus::Worsened
        } else if delta < -SEVERITY_THRESHOLD {
            FindingStatus::Improved
        } else {
            continue;
        };
        let fd = FindingDelta {
            status,
            finding: (*new_f).clone(),
            old_severity: old_f.severity(),
            new_severity: new_f.severity(),
            severity_delta: delta,
        };
        match status {
            FindingStatus::Worsened => worsened.push(fd),
            FindingStatus::Improved => improved.push(fd),
        }
    }

    (added, resolved, worsened, improved)
}

fn diff_file_signals(
    old: &BTreeMap<String, BTreeMap<String, f64>>,
    new: &BTreeMap<String, BTreeMap<String, f64>>,
    metric_threshold: f64,
) -> Vec<FileDelta> {
    let paths: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut out = Vec::new();

    for path in paths {
        let (status, metric_deltas) = match (old.get(path), new.get(path)) {
            (Some(o), Some(n)) => (FileStatus::Changed, diff_metrics(o, n, Some(metric_threshold))),
            (None, Some(n)) => (
                FileStatus::New,
                n.iter().map(|(m, v)| (m.clone(), MetricDelta::new(m, 0.0, *v))).collect(),
            ),
            (Some(o), None) => (
                FileStatus::Removed,
                o.iter().map(|(m, v)| (m.clone(), MetricDelta::new(m, *v, 0.0))).collect(),
            ),
            (None, None) => continue,
        };
        // unchanged files are omitted
        if status == FileStatus::Changed && metric_deltas.is_empty() {
            continue;
        }
        out.push(FileDelta {
            path: path.clone(),
            status,
            metric_deltas,
        });
    }
    out
}

/// Deltas over the union of metric names, missing values read as 0.
/// With a threshold, only changes strictly larger than it are kept.
fn diff_metrics(
    old: &BTreeMap<String, f64>,
    new: &BTreeMap<String, f64>,
    threshold: Option<f64>,
) -> BTreeMap<String, MetricDelta> {
    let metrics: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    metrics
        .into_iter()
        .map(|m| {
            let o = old.get(m).copied().unwrap_or(0.0);
            let n = new.get(m).copied().unwrap_or(0.0);
            (m.clone(), MetricDelta::new(m, o, n))
        })
        .filter(|(_, d)| threshold.map_or(true, |t| d.delta.abs() > t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Finding;

    fn record(kind: &str, files: &[&str], severity: f64) -> FindingRecord {
        let f = Finding::new(kind, severity, "t").with_files(files.iter().map(|s| s.to_string()).collect());
        FindingRecord::from(&f)
    }

    fn signals(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_direction_follows_polarity() {
        assert_eq!(classify_direction("cognitive_load", 0.3), Direction::Worse);
        assert_eq!(classify_direction("cognitive_load", -0.3), Direction::Better);
        assert_eq!(classify_direction("semantic_coherence", 0.3), Direction::Better);
        assert_eq!(classify_direction("class_count", 3.0), Direction::Neutral);
        assert_eq!(classify_direction("not_a_signal", 5.0), Direction::Neutral);
        assert_eq!(classify_direction("cognitive_load", 0.0005), Direction::Neutral);
    }

    #[test]
    fn test_finding_buckets() {
        let mut old = Snapshot::new(".");
        old.findings = vec![
            record("god_file", &["a.py"], 0.5),
            record("god_file", &["b.py"], 0.5),
            record("orphan_code", &["c.py"], 0.4),
            record("weak_link", &["d.py"], 0.6),
        ];
        let mut new = Snapshot::new(".");
        new.findings = vec![
            record("god_file", &["a.py"], 0.8),
            record("god_file", &["b.py"], 0.505),
            record("weak_link", &["d.py"], 0.3),
            record("hollow_code", &["e.py"], 0.7),
        ];

        let diff = diff_snapshots(&old, &new, &BTreeMap::new(), DEFAULT_METRIC_THRESHOLD);
        assert_eq!(diff.new_findings.len(), 1);
        assert_eq!(diff.resolved_findings[0].finding_type(), "orphan_code");
        assert_eq!(diff.worsened_findings.len(), 1);
        assert!((diff.worsened_findings[0].severity_delta - 0.3).abs() < 1e-9);
        assert_eq!(diff.improved_findings[0].finding.files(), &["d.py".to_string()]);
        assert_eq!(diff.debt_velocity, 0);
    }

    #[test]
    fn test_file_deltas() {
        let mut old = Snapshot::new(".");
        old.file_signals.insert("a.py".into(), signals(&[("cognitive_load", 0.5), ("lines", 100.0)]));
        old.file_signals.insert("gone.py".into(), signals(&[("lines", 10.0)]));
        let mut new = Snapshot::new(".");
        new.file_signals.insert("a.py".into(), signals(&[("cognitive_load", 0.8), ("lines", 100.005)]));
        new.file_signals.insert("fresh.py".into(), signals(&[("lines", 20.0)]));

        let diff = diff_snapshots(&old, &new, &BTreeMap::new(), DEFAULT_METRIC_THRESHOLD);
        let by_path: BTreeMap<&str, &FileDelta> = diff.file_deltas.iter().map(|d| (d.path.as_str(), d)).collect();

        let a = by_path["a.py"];
        assert_eq!(a.status, FileStatus::Changed);
        // sub-threshold lines change is dropped
        assert_eq!(a.metric_deltas.len(), 1);
        assert_eq!(a.metric_deltas["cognitive_load"].direction, Direction::Worse);
        assert_eq!(by_path["fresh.py"].status, FileStatus::New);
        assert_eq!(by_path["gone.py"].metric_deltas["lines"].delta, -10.0);
        assert_eq!(diff.worsening_files, vec!["a.py"]);
    }

    #[test]
    fn test_renames_match_old_paths() {
        let mut old = Snapshot::new(".");
        old.file_signals.insert("old.py".into(), signals(&[("lines", 10.0)]));
        old.findings = vec![record("god_file", &["old.py"], 0.5)];
        let mut new = Snapshot::new(".");
        new.file_signals.insert("new.py".into(), signals(&[("lines", 10.0)]));
        new.findings = vec![record("god_file", &["new.py"], 0.5)];

        let renames = BTreeMap::from([("old.py".to_string(), "new.py".to_string())]);
        let diff = diff_snapshots(&old, &new, &renames, DEFAULT_METRIC_THRESHOLD);
        assert!(diff.file_deltas.is_empty());
        assert!(diff.new_findings.is_empty());
        assert!(diff.resolved_findings.is_empty());
        assert_eq!(diff.renames, vec![("old.py".to_string(), "new.py".to_string())]);
    }

    #[test]
    fn test_codebase_and_module_deltas() {
        let mut old = Snapshot::new(".");
        old.global_signals = signals(&[("modularity", 0.4), ("team_size", 2.0)]);
        old.module_signals.insert("core".into(), signals(&[("instability", 0.2)]));
        let mut new = Snapshot::new(".");
        new.global_signals = signals(&[("modularity", 0.6), ("team_size", 2.0)]);
        new.module_signals.insert("core".into(), signals(&[("instability", 0.2)]));

        let diff = diff_snapshots(&old, &new, &BTreeMap::new(), DEFAULT_METRIC_THRESHOLD);
        // codebase deltas are reported even when unchanged
        assert_eq!(diff.codebase_deltas.len(), 2);
        assert_eq!(diff.codebase_deltas["modularity"].direction, Direction::Better);
        assert_eq!(diff.codebase_deltas["team_size"].direction, Direction::Neutral);
        assert!(diff.module_deltas.is_empty());
    }
}
