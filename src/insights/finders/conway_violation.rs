//! Conway violations: coupled modules with disjoint author groups
//!
//! For each module pair joined by imports:
//! - coupling = 2 × edges between them / (cross-module edges of both),
//!   1.0 when the two only talk to each other
//! - author distance = mean file-pair distance across the two modules over
//!   files with history; pairs sharing no author count as 1.0
//!
//! Reported when distance > 0.8 and coupling > 0.3.

use std::collections::{BTreeMap, BTreeSet};

use crate::architecture::Architecture;
use crate::error::ShannonResult;
use crate::graph::AuthorDistance;
use crate::insights::base::Finder;
use crate::insights::threshold::{compute_confidence, Margin};
use crate::models::{Effort, Evidence, Finding, FindingScope};
use crate::signals::{Polarity, Tier};
use crate::store::{FactStore, SlotKind};

const AUTHOR_DISTANCE_THRESHOLD: f64 = 0.8;
const COUPLING_THRESHOLD: f64 = 0.3;
const BASE_SEVERITY: f64 = 0.55;

pub struct ConwayViolationFinder;

/// Undirected module pairs with the file-level edge count between them.
fn coupled_pairs(arch: &Architecture) -> BTreeMap<(&str, &str), usize> {
    let mut pairs: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for (src, targets) in &arch.module_graph {
        for (tgt, count) in targets {
            if src == tgt || src == "." || tgt == "." {
                continue;
            }
            let key = if src < tgt { (src.as_str(), tgt.as_str()) } else { (tgt.as_str(), src.as_str()) };
            *pairs.entry(key).or_insert(0) += count;
        }
    }
    pairs
}

fn structural_coupling(arch: &Architecture, a: &str, b: &str, edges: usize) -> f64 {
    let external = |m: &str| {
        arch.modules
            .get(m)
            .map_or(0, |m| m.afferent_coupling + m.efferent_coupling)
    };
    let total = external(a) + external(b);
    if total == 0 {
        return 0.0;
    }
    (2.0 * edges as f64 / total as f64).min(1.0)
}

fn files_with_history<'a>(arch: &'a Architecture, module: &str, with_history: &BTreeSet<String>) -> Vec<&'a str> {
    arch.modules
        .get(module)
        .map(|m| m.files.iter().filter(|f| with_history.contains(*f)).map(String::as_str).collect())
        .unwrap_or_default()
}

fn module_author_distance(
    arch: &Architecture,
    a: &str,
    b: &str,
    distances: &BTreeMap<(&str, &str), f64>,
    with_history: &BTreeSet<String>,
) -> Option<f64> {
    let files_a = files_with_history(arch, a, with_history);
    let files_b = files_with_history(arch, b, with_history);
    if files_a.is_empty() || files_b.is_empty() {
        return None;
    }
    let mut sum = 0.0;
    for fa in &files_a {
        for fb in &files_b {
            let key = if fa < fb { (*fa, *fb) } else { (*fb, *fa) };
            sum += distances.get(&key).copied().unwrap_or(1.0);
        }
    }
    Some(sum / (files_a.len() * files_b.len()) as f64)
}

fn find_violations(arch: &Architecture, author_distances: &[AuthorDistance], with_history: &BTreeSet<String>) -> Vec<Finding> {
    let distances: BTreeMap<(&str, &str), f64> = author_distances
        .iter()
        .map(|d| {
            let (a, b) = (d.file_a.as_str(), d.file_b.as_str());
            (if a < b { (a, b) } else { (b, a) }, d.distance)
        })
        .collect();

    let mut findings = Vec::new();
    for ((a, b), edges) in coupled_pairs(arch) {
        let coupling = structural_coupling(arch, a, b, edges);
        if coupling <= COUPLING_THRESHOLD {
            continue;
        }
        let Some(distance) = module_author_distance(arch, a, b, &distances, with_history) else {
            continue;
        };
        if distance <= AUTHOR_DISTANCE_THRESHOLD {
            continue;
        }

        let confidence = compute_confidence(&[
            Margin::new(distance, AUTHOR_DISTANCE_THRESHOLD, Polarity::HighIsBad),
            Margin::new(coupling, COUPLING_THRESHOLD, Polarity::HighIsBad),
        ]);
        findings.push(
            Finding::new("conway_violation", BASE_SEVERITY, format!("Conway violation: {a} <-> {b}"))
                .with_files(vec![a.to_string(), b.to_string()])
                .with_evidence(vec![
                    Evidence::new(
                        "author_distance",
                        distance,
                        0.0,
                        format!("Author distance = {distance:.2} (different teams)"),
                    ),
                    Evidence::new(
                        "structural_coupling",
                        coupling,
                        0.0,
                        format!("Structural coupling = {coupling:.2} ({edges} import edges)"),
                    ),
                ])
                .with_suggestion("Coupled modules maintained by different people. Align ownership with module boundaries.")
                .with_confidence(confidence)
                .with_effort(Effort::High)
                .with_scope(FindingScope::ModulePair),
        );
    }
    findings
}

impl Finder for ConwayViolationFinder {
    fn name(&self) -> &'static str {
        "conway_violation"
    }

    fn description(&self) -> &'static str {
        "Structurally coupled modules maintained by different authors"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::AuthorDistances, SlotKind::Architecture, SlotKind::GitHistory]
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Bayesian
    }

    fn scope(&self) -> FindingScope {
        FindingScope::ModulePair
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let arch = store.architecture.value()?;
        let distances = store.author_distances.value()?;
        let history = store.git_history.value()?;
        Ok(find_violations(arch, distances, &history.file_set))
    }
}
