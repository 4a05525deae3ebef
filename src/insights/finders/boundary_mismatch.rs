//! Boundary mismatch: directories that do not match the dependency clusters
//!
//! A module with boundary alignment below 0.7 has files whose Louvain
//! community is not the module's dominant one. Each such file is paired
//! with the module where most of its community lives; modules with no
//! relocatable file, with at most two files, or at the root are skipped.

use std::collections::BTreeMap;

use crate::architecture::Module;
use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::insights::finders::file_name;
use crate::models::{parent_dir, Effort, Evidence, Finding, FindingScope};
use crate::store::{FactStore, SlotKind};

const ALIGNMENT_THRESHOLD: f64 = 0.7;
const MIN_FILES: usize = 3;
const BASE_SEVERITY: f64 = 0.6;
const LISTED_MOVES: usize = 4;

pub struct BoundaryMismatchFinder;

/// Module holding the most files of each community; ties go to the
/// module that sorts first.
fn community_homes(node_community: &BTreeMap<String, u32>) -> BTreeMap<u32, String> {
    let mut counts: BTreeMap<u32, BTreeMap<String, usize>> = BTreeMap::new();
    for (file, community) in node_community {
        *counts.entry(*community).or_default().entry(parent_dir(file)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter_map(|(community, modules)| {
            let best = modules.values().copied().max()?;
            let home = modules.into_iter().find(|(_, n)| *n == best)?.0;
            Some((community, home))
        })
        .collect()
}

fn evaluate(
    module: &Module,
    node_community: &BTreeMap<String, u32>,
    homes: &BTreeMap<u32, String>,
) -> Option<Finding> {
    let path = module.path.as_str();
    if path == "." || path.is_empty() || module.file_count() < MIN_FILES {
        return None;
    }
    let alignment = module.boundary_alignment;
    if alignment >= ALIGNMENT_THRESHOLD {
        return None;
    }

    let mut distribution: BTreeMap<u32, usize> = BTreeMap::new();
    for f in &module.files {
        if let Some(c) = node_community.get(f) {
            *distribution.entry(*c).or_insert(0) += 1;
        }
    }
    let top = distribution.values().copied().max()?;
    let dominant = distribution.iter().find(|(_, n)| **n == top).map(|(c, _)| *c)?;

    let moves: Vec<(&str, &str)> = module
        .files
        .iter()
        .filter_map(|f| {
            let c = node_community.get(f)?;
            if *c == dominant {
                return None;
            }
            let home = homes.get(c)?;
            (home != path && home != ".").then_some((f.as_str(), home.as_str()))
        })
        .collect();
    if moves.is_empty() {
        return None;
    }

    let clusters = distribution.len();
    let strength = (1.0 - alignment).clamp(0.1, 1.0);
    let mut relocations: Vec<String> = moves
        .iter()
        .take(LISTED_MOVES)
        .map(|(f, home)| format!("  {} is more connected to {home}/", file_name(f)))
        .collect();
    if moves.len() > LISTED_MOVES {
        relocations.push(format!("  ...and {} more", moves.len() - LISTED_MOVES));
    }

    let mut files = vec![path.to_string()];
    files.extend(moves.iter().map(|(f, _)| f.to_string()));

    Some(
        Finding::new("boundary_mismatch", BASE_SEVERITY * strength, format!("Boundary mismatch: {path}/"))
            .with_files(files)
            .with_evidence(vec![
                Evidence::new(
                    "boundary_alignment",
                    alignment,
                    0.0,
                    format!("only {:.0}% of files share the directory's dependency cluster", alignment * 100.0),
                ),
                Evidence::new(
                    "community_count",
                    clusters as f64,
                    0.0,
                    format!("{clusters} distinct clusters inside this directory"),
                ),
            ])
            .with_suggestion(format!(
                "Files in {path}/ belong to {clusters} clusters. Consider moving:\n{}",
                relocations.join("\n")
            ))
            .with_confidence(0.7)
            .with_effort(Effort::High)
            .with_scope(FindingScope::Module),
    )
}

impl Finder for BoundaryMismatchFinder {
    fn name(&self) -> &'static str {
        "boundary_mismatch"
    }

    fn description(&self) -> &'static str {
        "Directories whose files belong to other dependency clusters"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::Structural, SlotKind::Architecture]
    }

    fn scope(&self) -> FindingScope {
        FindingScope::Module
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let node_community = &store.structural.value()?.analysis.node_community;
        let arch = store.architecture.value()?;
        let homes = community_homes(node_community);
        Ok(arch
            .modules
            .values()
            .filter_map(|m| evaluate(m, node_community, &homes))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn communities(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(f, c)| (f.to_string(), *c)).collect()
    }

    fn module(path: &str, files: &[&str], alignment: f64) -> Module {
        Module {
            path: path.into(),
            files: files.iter().map(|f| f.to_string()).collect(),
            boundary_alignment: alignment,
            ..Default::default()
        }
    }

    #[test]
    fn test_misplaced_file_points_to_its_cluster() {
        let nc = communities(&[
            ("util/a.py", 0),
            ("util/b.py", 0),
            ("util/auth.py", 1),
            ("auth/login.py", 1),
            ("auth/token.py", 1),
        ]);
        let homes = community_homes(&nc);
        assert_eq!(homes[&1], "auth");

        let m = module("util", &["util/a.py", "util/b.py", "util/auth.py"], 2.0 / 3.0);
        let f = evaluate(&m, &nc, &homes).unwrap();
        assert_eq!(f.files, vec!["util", "util/auth.py"]);
        assert_eq!(f.scope, FindingScope::Module);
        assert!((f.severity - 0.6 / 3.0).abs() < 1e-9);
        assert!(f.suggestion.contains("auth.py is more connected to auth/"));
        assert_eq!(f.evidence[1].value, 2.0);
    }

    #[test]
    fn test_skips() {
        let nc = communities(&[("util/a.py", 0), ("util/b.py", 1), ("util/c.py", 2)]);
        let homes = community_homes(&nc);
        // aligned enough
        assert!(evaluate(&module("util", &["util/a.py", "util/b.py", "util/c.py"], 0.7), &nc, &homes).is_none());
        // too small
        assert!(evaluate(&module("util", &["util/a.py", "util/b.py"], 0.5), &nc, &homes).is_none());
        // every cluster lives here, nowhere to move to
        assert!(evaluate(&module("util", &["util/a.py", "util/b.py", "util/c.py"], 1.0 / 3.0), &nc, &homes).is_none());
        assert!(evaluate(&module(".", &["a.py", "b.py", "c.py"], 0.1), &nc, &homes).is_none());
    }
}
