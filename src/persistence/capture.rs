use chrono::Utc;

use super::models::{
    CochangeEdge, CommunityRecord, FindingRecord, LayerRecord, Snapshot, ViolationRecord, SCHEMA_VERSION,
};
use crate::config::AnalysisSettings;
use crate::insights::InsightResult;
use crate::store::FactStore;

/// Freezes the store and kernel result into a snapshot.
///
/// Signal maps come from the fused field; without one (fusion failed) the
/// snapshot still records findings, edges and metadata.
pub fn capture_snapshot(store: &FactStore, result: &InsightResult, settings: &AnalysisSettings) -> Snapshot {
    let mut snap = Snapshot {
        schema_version: SCHEMA_VERSION,
        timestamp: Utc::now(),
        config_hash: settings.config_hash(),
        analyzers_ran: result.analyzers_ran.clone(),
        tier: result.tier,
        file_count: store.files().len(),
        module_count: store.modules().len(),
        findings: result.findings.iter().map(FindingRecord::from).collect(),
        ..Snapshot::new(store.root.clone())
    };

    if let Some(history) = store.git_history.get() {
        snap.commit_sha = history.commits.first().map(|c| c.hash.clone());
        snap.commits_analyzed = history.commits.len();
    }

    if let Some(field) = store.signal_field.get() {
        snap.file_signals = field.per_file.iter().map(|(p, fs)| (p.clone(), fs.to_map())).collect();
        snap.module_signals = field.per_module.iter().map(|(p, ms)| (p.clone(), ms.to_map())).collect();
        snap.global_signals = field.global_signals.to_map();
        snap.delta_h = field.delta_h.clone();
    }

    if let Some(structural) = store.structural.get() {
        snap.dependency_edges = structural
            .graph
            .adjacency
            .iter()
            .flat_map(|(src, targets)| targets.iter().map(move |t| (src.clone(), t.clone())))
            .collect();
        snap.communities = structural
            .analysis
            .communities
            .iter()
            .map(|c| CommunityRecord {
                id: c.id,
                members: c.members.clone(),
            })
            .collect();
        snap.modularity_score = structural.analysis.modularity;
    }

    if let Some(cochange) = store.cochange.get() {
        snap.cochange_edges = cochange
            .pairs
            .values()
            .map(|p| CochangeEdge {
                file_a: p.file_a.clone(),
                file_b: p.file_b.clone(),
                count: p.cochange_count,
                lift: p.lift,
            })
            .collect();
    }

    if let Some(arch) = store.architecture.get() {
        snap.module_count = arch.module_count();
        snap.modules = arch.modules.keys().cloned().collect();
        snap.layers = arch
            .layers
            .iter()
            .map(|l| LayerRecord {
                depth: l.depth,
                modules: l.modules.clone(),
            })
            .collect();
        snap.violations = arch
            .violations
            .iter()
            .map(|v| ViolationRecord {
                source: v.source_module.clone(),
                target: v.target_module.clone(),
                edge_count: v.edge_count,
            })
            .collect();
    }

    snap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileMetrics, Finding};
    use crate::temporal::{Commit, GitHistory};
    use std::collections::BTreeMap;

    #[test]
    fn test_capture_without_field() {
        let mut store = FactStore::new("/repo");
        store.ingest_scan(
            vec![FileMetrics {
                path: "src/a.py".into(),
                ..Default::default()
            }],
            BTreeMap::new(),
            BTreeMap::new(),
        );
        store.git_history.set(
            GitHistory::from_commits(vec![
                Commit {
                    hash: "new".into(),
                    timestamp: 200,
                    ..Default::default()
                },
                Commit {
                    hash: "old".into(),
                    timestamp: 100,
                    ..Default::default()
                },
            ]),
            "test",
        );
        let result = InsightResult {
            findings: vec![Finding::new("god_file", 0.6, "t").with_files(vec!["src/a.py".into()])],
            analyzers_ran: vec!["semantics".into()],
            ..Default::default()
        };

        let snap = capture_snapshot(&store, &result, &AnalysisSettings::default());
        assert_eq!(snap.analyzed_path, "/repo");
        assert_eq!(snap.commit_sha.as_deref(), Some("new"));
        assert_eq!(snap.commits_analyzed, 2);
        assert_eq!(snap.file_count, 1);
        assert_eq!(snap.module_count, 1);
        assert_eq!(snap.findings[0].identity_key, result.findings[0].identity_key());
        assert!(snap.file_signals.is_empty());
        assert_eq!(snap.config_hash, AnalysisSettings::default().config_hash());
    }
}
