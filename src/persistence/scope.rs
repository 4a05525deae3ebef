//! Change-scoped reports
//!
//! Given the files a change touches and a full snapshot: who depends on
//! them (blast radius), which findings they are involved in, and a coarse
//! risk level for the change.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::models::{FindingRecord, Snapshot};

const CRITICAL_HUB_SEVERITY: f64 = 0.8;
const HIGH_SEVERITY_SUM: f64 = 1.5;
const HIGH_BLAST_SHARE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRiskSummary {
    pub path: String,
    pub signals: BTreeMap<String, f64>,
    /// Share of files with a strictly lower value, in `[0, 1)`.
    pub percentiles: BTreeMap<String, f64>,
    pub dependents_count: usize,
    pub findings_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeScopedReport {
    pub changed_files: Vec<String>,
    pub blast_radius_files: Vec<String>,
    /// Findings touching a changed file.
    pub direct_findings: Vec<FindingRecord>,
    /// Findings touching only files in the blast radius.
    pub blast_findings: Vec<FindingRecord>,
    pub file_risk: Vec<FileRiskSummary>,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
}

fn reverse_edges(edges: &[(String, String)]) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut reverse: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (src, dst) in edges {
        reverse.entry(dst.as_str()).or_default().insert(src.as_str());
    }
    reverse
}

/// Every file transitively depending on a changed file, sorted, without
/// the changed files themselves. Edges are `(importer, imported)`.
pub fn compute_blast_radius(changed: &[String], edges: &[(String, String)]) -> Vec<String> {
    let reverse = reverse_edges(edges);
    let changed_set: BTreeSet<&str> = changed.iter().map(String::as_str).collect();

    let mut seen: BTreeSet<&str> = changed_set.clone();
    let mut queue: VecDeque<&str> = changed_set.iter().copied().collect();
    while let Some(node) = queue.pop_front() {
        for &dep in reverse.get(node).into_iter().flatten() {
            if seen.insert(dep) {
                queue.push_back(dep);
            }
        }
    }

    seen.into_iter()
        .filter(|f| !changed_set.contains(f))
        .map(String::from)
        .collect()
}

pub fn build_scoped_report(changed: &[String], snapshot: &Snapshot) -> ChangeScopedReport {
    let blast = compute_blast_radius(changed, &snapshot.dependency_edges);
    let changed_set: BTreeSet<&str> = changed.iter().map(String::as_str).collect();
    let blast_set: BTreeSet<&str> = blast.iter().map(String::as_str).collect();

    let mut direct_findings = Vec::new();
    let mut blast_findings = Vec::new();
    for f in &snapshot.findings {
        if f.files().iter().any(|p| changed_set.contains(p.as_str())) {
            direct_findings.push(f.clone());
        } else if f.files().iter().any(|p| blast_set.contains(p.as_str())) {
            blast_findings.push(f.clone());
        }
    }

    let reverse = reverse_edges(&snapshot.dependency_edges);
    let sorted_values = sorted_metric_values(&snapshot.file_signals);
    let file_risk = changed
        .iter()
        .map(|path| {
            let signals = snapshot.file_signals.get(path).cloned().unwrap_or_default();
            let percentiles = signals
                .iter()
                .filter_map(|(m, v)| {
                    let values = sorted_values.get(m.as_str())?;
                    let below = values.partition_point(|x| x < v);
                    Some((m.clone(), below as f64 / values.len() as f64))
                })
                .collect();
            FileRiskSummary {
                path: path.clone(),
                signals,
                percentiles,
                dependents_count: reverse.get(path.as_str()).map_or(0, BTreeSet::len),
                findings_count: snapshot.findings.iter().filter(|f| f.files().contains(path)).count(),
            }
        })
        .collect();

    let (risk_level, risk_reason) = risk_level(&direct_findings, blast.len(), snapshot.file_count);

    ChangeScopedReport {
        changed_files: changed.to_vec(),
        blast_radius_files: blast,
        direct_findings,
        blast_findings,
        file_risk,
        risk_level,
        risk_reason,
    }
}

fn sorted_metric_values(signals: &BTreeMap<String, BTreeMap<String, f64>>) -> BTreeMap<&str, Vec<f64>> {
    let mut out: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for sigs in signals.values() {
        for (m, v) in sigs {
            out.entry(m.as_str()).or_default().push(*v);
        }
    }
    for values in out.values_mut() {
        values.sort_by(f64::total_cmp);
    }
    out
}

fn risk_level(direct: &[FindingRecord], blast_len: usize, file_count: usize) -> (RiskLevel, String) {
    if direct.is_empty() {
        return (RiskLevel::Low, "No findings involve changed files".to_string());
    }

    if let Some(hub) = direct
        .iter()
        .find(|f| f.finding_type() == "high_risk_hub" && f.severity() > CRITICAL_HUB_SEVERITY)
    {
        let primary = hub.files().first().map_or("unknown", String::as_str);
        return (
            RiskLevel::Critical,
            format!("Changed file {primary} is a high-risk hub (severity {:.2})", hub.severity()),
        );
    }

    let severity_sum: f64 = direct.iter().map(FindingRecord::severity).sum();
    let blast_share = blast_len as f64 / file_count.max(1) as f64;
    let mut reasons = Vec::new();
    if severity_sum > HIGH_SEVERITY_SUM {
        reasons.push(format!("finding severity sum {severity_sum:.2}"));
    }
    if blast_share > HIGH_BLAST_SHARE {
        reasons.push(format!(
            "blast radius {blast_len} files ({:.0}% of codebase)",
            blast_share * 100.0
        ));
    }
    if !reasons.is_empty() {
        return (RiskLevel::High, reasons.join(" and "));
    }

    (RiskLevel::Medium, format!("{} finding(s) involve changed files", direct.len()))
}
