//! Hidden coupling: files that change together with no import between them
//!
//! A pair qualifies when it co-changed at least 3 times, with lift ≥ 2,
//! max confidence ≥ 0.5 and mutual information ≥ 0.05 bits. The MI filter
//! drops bulk-edit noise where both files change in nearly every commit.

use crate::error::ShannonResult;
use crate::graph::DependencyGraph;
use crate::insights::base::Finder;
use crate::math::entropy::mutual_information;
use crate::models::{parent_dir, Effort, Evidence, Finding, FindingScope};
use crate::store::{FactStore, SlotKind};
use crate::temporal::{CoChangeMatrix, CoChangePair};

use super::{by_severity_desc, file_name};

const MIN_COCHANGE: usize = 3;
const MIN_LIFT: f64 = 2.0;
const MIN_CONFIDENCE: f64 = 0.5;
const MIN_MI: f64 = 0.05;
const BASE_SEVERITY: f64 = 0.9;
const MAX_FINDINGS: usize = 20;

pub struct HiddenCouplingFinder;

/// MI of the 2×2 "A changed / B changed" contingency table.
fn pair_mutual_information(pair: &CoChangePair, matrix: &CoChangeMatrix) -> f64 {
    let total_a = matrix.file_change_counts.get(&pair.file_a).copied().unwrap_or(0);
    let total_b = matrix.file_change_counts.get(&pair.file_b).copied().unwrap_or(0);
    let joint = pair.cochange_count;
    let only_a = total_a.saturating_sub(joint);
    let only_b = total_b.saturating_sub(joint);
    let neither = (matrix.total_commits + joint).saturating_sub(total_a + total_b);
    mutual_information(joint as f64, only_a as f64, only_b as f64, neither as f64)
}

fn describe_confidence(pair: &CoChangePair) -> String {
    let (a, b) = (file_name(&pair.file_a), file_name(&pair.file_b));
    if pair.confidence_a_b >= pair.confidence_b_a {
        format!(
            "when {a} changed, {b} also changed {} of {} times ({:.0}%)",
            pair.cochange_count,
            pair.total_a,
            pair.confidence_a_b * 100.0
        )
    } else {
        format!(
            "when {b} changed, {a} also changed {} of {} times ({:.0}%)",
            pair.cochange_count,
            pair.total_b,
            pair.confidence_b_a * 100.0
        )
    }
}

fn suggestion(pair: &CoChangePair) -> String {
    if parent_dir(&pair.file_a) == parent_dir(&pair.file_b) {
        format!(
            "{} and {} are in the same package and always change together, but neither imports the other. \
             Make this explicit: add an import or extract shared logic.",
            file_name(&pair.file_a),
            file_name(&pair.file_b)
        )
    } else {
        "These files live in different packages but always change together. \
         Find what ties them and make it explicit via import or shared module."
            .to_string()
    }
}

fn evaluate(pair: &CoChangePair, matrix: &CoChangeMatrix, graph: &DependencyGraph) -> Option<Finding> {
    let (a, b) = (pair.file_a.as_str(), pair.file_b.as_str());
    if a.ends_with("__init__.py") || b.ends_with("__init__.py") {
        return None;
    }
    let max_conf = pair.confidence_a_b.max(pair.confidence_b_a);
    if pair.cochange_count < MIN_COCHANGE || pair.lift < MIN_LIFT || max_conf < MIN_CONFIDENCE {
        return None;
    }
    let mi = pair_mutual_information(pair, matrix);
    if mi < MIN_MI {
        return None;
    }
    if graph.imports(a).iter().any(|t| t == b) || graph.imports(b).iter().any(|t| t == a) {
        return None;
    }

    let strength = ((pair.lift / 10.0 + max_conf + mi) / 3.0).clamp(0.1, 1.0);
    Some(
        Finding::new(
            "hidden_coupling",
            BASE_SEVERITY * strength,
            format!("{a} and {b} always change together"),
        )
        .with_files(vec![a.to_string(), b.to_string()])
        .with_evidence(vec![
            Evidence::new("cochange_count", pair.cochange_count as f64, 0.0, describe_confidence(pair)),
            Evidence::new(
                "cochange_lift",
                pair.lift,
                0.0,
                format!("{:.1}x more often than expected by chance", pair.lift),
            ),
            Evidence::new("mutual_information", mi, 0.0, format!("MI = {mi:.3} bits")),
            Evidence::new("no_import", 0.0, 0.0, "neither file imports the other"),
        ])
        .with_suggestion(suggestion(pair))
        .with_confidence(0.8)
        .with_effort(Effort::Low)
        .with_scope(FindingScope::FilePair),
    )
}

impl Finder for HiddenCouplingFinder {
    fn name(&self) -> &'static str {
        "hidden_coupling"
    }

    fn description(&self) -> &'static str {
        "Files that always change together without importing each other"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::Structural, SlotKind::Cochange]
    }

    fn scope(&self) -> FindingScope {
        FindingScope::FilePair
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let graph = &store.structural.value()?.graph;
        let matrix = store.cochange.value()?;
        let mut findings: Vec<Finding> = matrix
            .pairs
            .values()
            .filter_map(|p| evaluate(p, matrix, graph))
            .collect();
        findings.sort_by(by_severity_desc);
        findings.truncate(MAX_FINDINGS);
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn matrix(pair: CoChangePair) -> CoChangeMatrix {
        CoChangeMatrix {
            file_change_counts: BTreeMap::from([
                (pair.file_a.clone(), pair.total_a),
                (pair.file_b.clone(), pair.total_b),
            ]),
            pairs: BTreeMap::from([((pair.file_a.clone(), pair.file_b.clone()), pair)]),
            total_commits: 100,
        }
    }

    fn coupled(a: &str, b: &str) -> CoChangePair {
        CoChangePair {
            file_a: a.into(),
            file_b: b.into(),
            cochange_count: 8,
            total_a: 10,
            total_b: 10,
            confidence_a_b: 0.8,
            confidence_b_a: 0.8,
            lift: 8.0,
        }
    }

    #[test]
    fn test_mutual_information_of_strong_pair() {
        let pair = coupled("api/a.py", "db/b.py");
        let m = matrix(pair.clone());
        let mi = pair_mutual_information(&pair, &m);
        assert!(mi > 0.2 && mi < 0.3, "mi = {mi}");
    }

    #[test]
    fn test_hidden_pair_detected() {
        let pair = coupled("api/a.py", "db/b.py");
        let m = matrix(pair.clone());
        let graph = DependencyGraph::from_edges(["api/a.py", "db/b.py"], &[] as &[(&str, &str)]);
        let f = evaluate(&pair, &m, &graph).unwrap();
        assert_eq!(f.scope, FindingScope::FilePair);
        assert!(f.severity > 0.5 && f.severity < 0.6);
        assert!(f.suggestion.starts_with("These files live in different packages"));
        assert_eq!(f.evidence[0].description, "when a.py changed, b.py also changed 8 of 10 times (80%)");
    }

    #[test]
    fn test_import_makes_coupling_visible() {
        let pair = coupled("a.py", "b.py");
        let m = matrix(pair.clone());
        let graph = DependencyGraph::from_edges(["a.py", "b.py"], &[("b.py", "a.py")]);
        assert!(evaluate(&pair, &m, &graph).is_none());
    }

    #[test]
    fn test_weak_pairs_filtered() {
        let graph = DependencyGraph::default();
        let mut pair = coupled("a.py", "b.py");
        pair.lift = 1.5;
        assert!(evaluate(&pair, &matrix(pair.clone()), &graph).is_none());

        let mut pair = coupled("a.py", "b.py");
        pair.cochange_count = 2;
        assert!(evaluate(&pair, &matrix(pair.clone()), &graph).is_none());

        let pair = coupled("pkg/__init__.py", "b.py");
        assert!(evaluate(&pair, &matrix(pair.clone()), &graph).is_none());
    }
}
