//! Snapshot records
//!
//! A snapshot is the serialisable, immutable record of one analysis run.
//! Everything is plain maps and lists keyed by path so snapshots survive
//! changes to the in-memory signal structs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Finding;
use crate::signals::Tier;

pub const SCHEMA_VERSION: u32 = 2;

/// A finding plus the key that ties it across snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingRecord {
    pub identity_key: String,
    #[serde(flatten)]
    pub finding: Finding,
}

impl From<&Finding> for FindingRecord {
    fn from(finding: &Finding) -> Self {
        Self {
            identity_key: finding.identity_key(),
            finding: finding.clone(),
        }
    }
}

impl FindingRecord {
    pub fn finding_type(&self) -> &str {
        &self.finding.finding_type
    }

    pub fn severity(&self) -> f64 {
        self.finding.severity
    }

    pub fn files(&self) -> &[String] {
        &self.finding.files
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CochangeEdge {
    pub file_a: String,
    pub file_b: String,
    pub count: usize,
    pub lift: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub depth: usize,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub source: String,
    pub target: String,
    pub edge_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityRecord {
    pub id: u32,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub tool_version: String,
    /// Newest analyzed commit, when history was available.
    pub commit_sha: Option<String>,
    /// Serialised as RFC 3339.
    pub timestamp: DateTime<Utc>,
    pub analyzed_path: String,
    pub file_count: usize,
    pub module_count: usize,
    pub commits_analyzed: usize,
    pub analyzers_ran: Vec<String>,
    pub config_hash: String,
    pub tier: Option<Tier>,

    /// path -> signal name -> value
    pub file_signals: BTreeMap<String, BTreeMap<String, f64>>,
    pub module_signals: BTreeMap<String, BTreeMap<String, f64>>,
    pub global_signals: BTreeMap<String, f64>,

    pub findings: Vec<FindingRecord>,

    /// (importer, imported)
    pub dependency_edges: Vec<(String, String)>,
    #[serde(default)]
    pub cochange_edges: Vec<CochangeEdge>,

    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub layers: Vec<LayerRecord>,
    #[serde(default)]
    pub violations: Vec<ViolationRecord>,

    #[serde(default)]
    pub delta_h: BTreeMap<String, f64>,
    #[serde(default)]
    pub communities: Vec<CommunityRecord>,
    #[serde(default)]
    pub modularity_score: f64,
}

impl Snapshot {
    /// Empty snapshot stamped now; mostly a starting point for tests.
    pub fn new(analyzed_path: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            commit_sha: None,
            timestamp: Utc::now(),
            analyzed_path: analyzed_path.into(),
            file_count: 0,
            module_count: 0,
            commits_analyzed: 0,
            analyzers_ran: Vec::new(),
            config_hash: String::new(),
            tier: None,
            file_signals: BTreeMap::new(),
            module_signals: BTreeMap::new(),
            global_signals: BTreeMap::new(),
            findings: Vec::new(),
            dependency_edges: Vec::new(),
            cochange_edges: Vec::new(),
            modules: Vec::new(),
            layers: Vec::new(),
            violations: Vec::new(),
            delta_h: BTreeMap::new(),
            communities: Vec::new(),
            modularity_score: 0.0,
        }
    }
}

/// One row of `HistoryStore::list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub commit_sha: Option<String>,
    pub file_count: usize,
    pub finding_count: usize,
    pub is_baseline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Active,
    Resolved,
}

/// Where a finding has been across saved snapshots, keyed by identity.
///
/// `persistence_count` counts every snapshot the finding appeared in,
/// including earlier runs before it was last resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingLifecycle {
    pub identity_key: String,
    pub finding_type: String,
    pub title: String,
    pub files: Vec<String>,
    pub first_seen_snapshot: u64,
    pub last_seen_snapshot: u64,
    pub persistence_count: u32,
    pub current_status: LifecycleStatus,
    pub severity: f64,
}

impl FindingLifecycle {
    pub fn first_seen(snapshot_id: u64, record: &FindingRecord) -> Self {
        Self {
            identity_key: record.identity_key.clone(),
            finding_type: record.finding.finding_type.clone(),
            title: record.finding.title.clone(),
            files: record.finding.files.clone(),
            first_seen_snapshot: snapshot_id,
            last_seen_snapshot: snapshot_id,
            persistence_count: 1,
            current_status: LifecycleStatus::Active,
            severity: record.finding.severity,
        }
    }

    /// Records another appearance; title, files and severity follow the latest.
    pub fn observe(&mut self, snapshot_id: u64, record: &FindingRecord) {
        self.last_seen_snapshot = snapshot_id;
        self.persistence_count += 1;
        self.current_status = LifecycleStatus::Active;
        self.title = record.finding.title.clone();
        self.files = record.finding.files.clone();
        self.severity = record.finding.severity;
    }

    pub fn is_active(&self) -> bool {
        self.current_status == LifecycleStatus::Active
    }
}

/// One value of a metric in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub snapshot_id: u64,
    pub commit_sha: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// All global signals of one snapshot plus `active_findings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthPoint {
    pub snapshot_id: u64,
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<String, f64>,
}

/// A file whose metric moved between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub path: String,
    pub old_value: f64,
    pub new_value: f64,
    pub delta: f64,
}

/// A finding present in a run of consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentFinding {
    pub identity_key: String,
    pub finding_type: String,
    pub title: String,
    pub files: Vec<String>,
    pub severity: f64,
    /// Longest consecutive run.
    pub streak: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_record_json_is_flat() {
        let finding = Finding::new("god_file", 0.7, "God file: a.py").with_files(vec!["a.py".into()]);
        let record = FindingRecord::from(&finding);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["finding_type"], "god_file");
        assert_eq!(json["identity_key"], finding.identity_key());

        let back: FindingRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let snap = Snapshot::new("/repo");
        let json = serde_json::to_value(&snap).unwrap();
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
    }

    #[test]
    fn test_lifecycle_observe_reactivates() {
        let record = FindingRecord::from(&Finding::new("god_file", 0.7, "God file: a.py").with_files(vec!["a.py".into()]));
        let mut life = FindingLifecycle::first_seen(2, &record);
        life.current_status = LifecycleStatus::Resolved;

        let worse = FindingRecord::from(&Finding::new("god_file", 0.9, "God file: a.py").with_files(vec!["a.py".into()]));
        life.observe(5, &worse);
        assert!(life.is_active());
        assert_eq!((life.first_seen_snapshot, life.last_seen_snapshot), (2, 5));
        assert_eq!(life.persistence_count, 2);
        assert_eq!(life.severity, 0.9);
        assert_eq!(serde_json::to_value(life.current_status).unwrap(), "active");
    }
}
