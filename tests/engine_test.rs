//! End-to-end tests for the analysis engine
//!
//! Each test builds a synthetic codebase as scanner facts, runs the insight
//! kernel over it and checks the ranked findings, snapshots and diffs.

use std::collections::BTreeMap;

use shannon_insight::insights::threshold::ThresholdCheck;
use shannon_insight::insights::validation::{validate_post_fusion, ValidationError};
use shannon_insight::models::{FileMetrics, Finding, FindingScope};
use shannon_insight::persistence::diff::{Direction, DEFAULT_METRIC_THRESHOLD};
use shannon_insight::persistence::{
    capture_snapshot, compute_blast_radius, compute_identity_key, diff_snapshots, FindingRecord, HistoryStore, Snapshot,
};
use shannon_insight::signals::{FileSignals, Signal, SignalField, Tier};
use shannon_insight::temporal::{Commit, GitHistory};
use shannon_insight::{AnalysisSettings, FactStore, InsightKernel};
use tempfile::TempDir;

const WEEK: i64 = 7 * 86_400;

fn file(path: &str, lines: usize, imports: &[&str]) -> FileMetrics {
    FileMetrics {
        path: path.into(),
        lines,
        tokens: lines * 6,
        imports: imports.iter().map(|s| s.to_string()).collect(),
        functions: lines / 20,
        complexity_score: 2.0,
        nesting_depth: 2,
        function_sizes: vec![20; lines / 20],
        ..Default::default()
    }
}

/// 20 files under `pkg/`, all importing `pkg/core.py`, with 60 weekly
/// commits from three authors.
fn synthetic_store() -> FactStore {
    let mut files = vec![file("pkg/core.py", 900, &[])];
    for i in 0..19 {
        files.push(file(&format!("pkg/mod{i}.py"), 60 + i * 10, &["pkg.core"]));
    }
    let paths: Vec<String> = files.iter().map(|f| f.path.clone()).collect();

    let authors = ["ana@example.com", "bo@example.com", "cy@example.com"];
    let commits: Vec<Commit> = (0..60)
        .rev()
        .map(|i| Commit {
            hash: format!("c{i:03}"),
            timestamp: 1_700_000_000 + i as i64 * WEEK,
            author: authors[i % 3].to_string(),
            files: vec![paths[0].clone(), paths[1 + i % 19].clone()],
            subject: if i % 5 == 0 { "fix crash".into() } else { "update".into() },
        })
        .collect();

    let mut store = FactStore::new("/synthetic");
    store.ingest_scan(files, BTreeMap::new(), BTreeMap::new());
    store.git_history.set(GitHistory::from_commits(commits), "test");
    store
}

#[test]
fn test_kernel_runs_every_builtin_stage() {
    let mut store = synthetic_store();
    let kernel = InsightKernel::new(AnalysisSettings::default(), None).unwrap();
    let result = kernel.run(&mut store, 50).unwrap();

    assert_eq!(result.tier, Some(Tier::Bayesian));
    for name in ["semantics", "structural", "temporal", "architecture", "fusion"] {
        assert!(result.analyzers_ran.iter().any(|n| n == name), "{name} did not run");
    }
    let field = store.signal_field.value().unwrap();
    assert_eq!(field.file_count(), 20);
    assert_eq!(field.global_signals.team_size, 3);

    let structural = store.structural.value().unwrap();
    assert_eq!(structural.graph.edge_count, 19);

    assert!(result.findings.len() <= 50);
    assert!(result.total_before_cap >= result.findings.len());
    assert!(result
        .findings
        .windows(2)
        .all(|w| w[0].severity >= w[1].severity));
    for f in &result.findings {
        assert!((0.0..=1.0).contains(&f.severity));
        assert!((0.0..=1.0).contains(&f.confidence));
        if f.scope == FindingScope::File {
            assert!(field.file(&f.files[0]).is_some(), "unknown file {}", f.files[0]);
        }
    }
}

#[test]
fn test_snapshot_roundtrip_through_history() {
    let mut store = synthetic_store();
    let settings = AnalysisSettings::default();
    let result = InsightKernel::new(settings.clone(), None).unwrap().run(&mut store, 50).unwrap();
    let snapshot = capture_snapshot(&store, &result, &settings);

    assert_eq!(snapshot.commit_sha.as_deref(), Some("c059"));
    assert_eq!(snapshot.commits_analyzed, 60);
    assert_eq!(snapshot.dependency_edges.len(), 19);
    assert_eq!(snapshot.file_signals.len(), 20);

    let dir = TempDir::new().unwrap();
    let history = HistoryStore::open(&HistoryStore::default_path(dir.path())).unwrap();
    let id = history.save(&snapshot).unwrap();
    let loaded = history.load(id).unwrap();
    assert_eq!(loaded.commit_sha, snapshot.commit_sha);
    assert_eq!(loaded.tier, snapshot.tier);
    assert_eq!(loaded.findings.len(), snapshot.findings.len());
    assert_eq!(loaded.dependency_edges, snapshot.dependency_edges);
    assert_eq!(history.load_by_commit("c059").unwrap().map(|(i, _)| i), Some(id));

    let same = diff_snapshots(&loaded, &snapshot, &BTreeMap::new(), DEFAULT_METRIC_THRESHOLD);
    assert!(same.new_findings.is_empty());
    assert!(same.resolved_findings.is_empty());
    assert!(same.file_deltas.is_empty());
    assert_eq!(same.debt_velocity, 0);

    let blast = compute_blast_radius(&["pkg/core.py".to_string()], &snapshot.dependency_edges);
    assert_eq!(blast.len(), 19);
}

#[test]
fn test_post_fusion_names_missing_file() {
    let mut store = FactStore::new(".");
    store.ingest_scan(vec![file("a", 10, &[]), file("b", 10, &[])], BTreeMap::new(), BTreeMap::new());
    let field = SignalField {
        per_file: [("a".to_string(), FileSignals::new("a"))].into(),
        ..Default::default()
    };
    store.signal_field.set(field, "test");

    let err = validate_post_fusion(&store).unwrap_err();
    assert_eq!(err, ValidationError::MissingFiles(vec!["b".to_string()]));
    assert!(err.to_string().contains('b'));
}

#[test]
fn test_absolute_tier_without_threshold_never_fires() {
    let mut fs = FileSignals::new("a.py");
    fs.pagerank = 0.99;
    fs.percentiles.insert(Signal::Pagerank, 1.0);
    assert!(!ThresholdCheck::new(Tier::Absolute).above(&fs, Signal::Pagerank, 0.5));
    assert!(ThresholdCheck::new(Tier::Full).above(&fs, Signal::Pagerank, 0.5));
}

fn record(kind: &str, files: &[&str], severity: f64) -> FindingRecord {
    FindingRecord::from(&Finding::new(kind, severity, "t").with_files(files.iter().map(|s| s.to_string()).collect()))
}

#[test]
fn test_diff_reports_worsened_finding() {
    let mut a = Snapshot::new(".");
    a.findings = vec![record("god_file", &["gf1.py"], 0.5)];
    let mut b = Snapshot::new(".");
    b.findings = vec![record("god_file", &["gf1.py"], 0.8)];

    let diff = diff_snapshots(&a, &b, &BTreeMap::new(), DEFAULT_METRIC_THRESHOLD);
    assert_eq!(diff.worsened_findings.len(), 1);
    assert!((diff.worsened_findings[0].severity_delta - 0.3).abs() < 1e-9);
    assert!(diff.new_findings.is_empty() && diff.improved_findings.is_empty());
}

#[test]
fn test_diff_direction_follows_polarity() {
    let sig = |name: &str, v: f64| BTreeMap::from([(name.to_string(), v)]);
    let mut a = Snapshot::new(".");
    a.file_signals.insert("a.py".into(), sig("cognitive_load", 0.5));
    a.file_signals.insert("b.py".into(), sig("semantic_coherence", 0.5));
    let mut b = Snapshot::new(".");
    b.file_signals.insert("a.py".into(), sig("cognitive_load", 0.8));
    b.file_signals.insert("b.py".into(), sig("semantic_coherence", 0.8));

    let diff = diff_snapshots(&a, &b, &BTreeMap::new(), DEFAULT_METRIC_THRESHOLD);
    let direction = |path: &str, metric: &str| {
        diff.file_deltas
            .iter()
            .find(|d| d.path == path)
            .map(|d| d.metric_deltas[metric].direction)
    };
    assert_eq!(direction("a.py", "cognitive_load"), Some(Direction::Worse));
    assert_eq!(direction("b.py", "semantic_coherence"), Some(Direction::Better));
    assert_eq!(diff.worsening_files, vec!["a.py"]);
    assert_eq!(diff.improving_files, vec!["b.py"]);
}

#[test]
fn test_blast_radius_of_shared_dependency() {
    let edges: Vec<(String, String)> = [("a", "c"), ("b", "c"), ("d", "a"), ("d", "b")]
        .iter()
        .map(|(x, y)| (x.to_string(), y.to_string()))
        .collect();
    assert_eq!(compute_blast_radius(&["c".to_string()], &edges), vec!["a", "b", "d"]);
}

#[test]
fn test_identity_keys() {
    let ab = ["a".to_string(), "b".to_string()];
    let ba = ["b".to_string(), "a".to_string()];
    assert_eq!(compute_identity_key("hidden_coupling", &ab), compute_identity_key("hidden_coupling", &ba));
    assert_eq!(compute_identity_key("high_risk_hub", &ab), compute_identity_key("high_risk_hub", &ab));
    assert_eq!(compute_identity_key("high_risk_hub", &ab), compute_identity_key("high_risk_hub", &ab[..1]));
}
