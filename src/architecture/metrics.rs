//! Martin metrics per module
//!
//! - Ca / Ce: cross-module import edges in / out
//! - instability `I = Ce / (Ca + Ce)`, undefined for isolated modules
//! - abstractness `A` = abstract classes / classes
//! - main sequence distance `D = |A + I − 1|`
//!
//! Plus cohesion, coupling, role consistency and boundary alignment
//! against the Louvain communities.

use std::collections::BTreeMap;

use super::model::Module;
use crate::graph::DependencyGraph;
use crate::models::FileSyntax;
use crate::semantics::Role;

pub fn instability(ca: usize, ce: usize) -> Option<f64> {
    match ca + ce {
        0 => None,
        total => Some(ce as f64 / total as f64),
    }
}

pub fn main_seq_distance(abstractness: f64, instability: Option<f64>) -> f64 {
    instability.map_or(0.0, |i| (abstractness + i - 1.0).abs())
}

/// Share of the most common role, and that role. Ties go to the role that
/// sorts first.
pub fn role_consistency(files: &[String], roles: &BTreeMap<String, Role>) -> (f64, Role) {
    if files.is_empty() {
        return (0.0, Role::Unknown);
    }
    let mut counts: BTreeMap<Role, usize> = BTreeMap::new();
    for f in files {
        *counts.entry(roles.get(f).copied().unwrap_or_default()).or_insert(0) += 1;
    }
    let (role, count) = counts
        .into_iter()
        .fold((Role::Unknown, 0), |best, (r, c)| if c > best.1 { (r, c) } else { best });
    (count as f64 / files.len() as f64, role)
}

/// Share of files whose community is the module's most common community.
/// Files without a community are counted in the denominator only.
pub fn boundary_alignment(files: &[String], node_community: &BTreeMap<String, u32>) -> f64 {
    if files.is_empty() {
        return 0.0;
    }
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for f in files {
        if let Some(c) = node_community.get(f) {
            *counts.entry(*c).or_insert(0) += 1;
        }
    }
    let dominant = counts.values().copied().max().unwrap_or(0);
    dominant as f64 / files.len() as f64
}

fn abstractness(files: &[String], syntax: &BTreeMap<String, FileSyntax>) -> f64 {
    let (total, abstract_count) = files
        .iter()
        .filter_map(|f| syntax.get(f))
        .flat_map(|s| s.classes.iter())
        .fold((0usize, 0usize), |(t, a), c| (t + 1, a + usize::from(c.is_abstract)));
    if total == 0 {
        0.0
    } else {
        (abstract_count as f64 / total as f64).min(1.0)
    }
}

/// Fills every metric field of `module` in place.
pub fn compute_module_metrics(
    module: &mut Module,
    file_to_module: &BTreeMap<&str, &str>,
    graph: &DependencyGraph,
    roles: &BTreeMap<String, Role>,
    syntax: &BTreeMap<String, FileSyntax>,
    node_community: &BTreeMap<String, u32>,
) {
    let own = module.path.as_str();
    let (mut ca, mut ce, mut internal, mut external) = (0, 0, 0, 0);

    for file in &module.files {
        for target in graph.imports(file) {
            match file_to_module.get(target.as_str()) {
                Some(m) if *m == own => internal += 1,
                Some(_) => {
                    ce += 1;
                    external += 1;
                }
                None => external += 1,
            }
        }
        for source in graph.importers(file) {
            if matches!(file_to_module.get(source.as_str()), Some(m) if *m != own) {
                ca += 1;
            }
        }
    }

    module.afferent_coupling = ca;
    module.efferent_coupling = ce;
    module.internal_edges = internal;
    module.external_edges = external;
    module.instability = instability(ca, ce);

    let total = internal + external;
    module.coupling = if total > 0 { external as f64 / total as f64 } else { 0.0 };
    let n = module.files.len();
    let possible = n * n.saturating_sub(1);
    module.cohesion = if possible > 0 { internal as f64 / possible as f64 } else { 0.0 };

    module.abstractness = abstractness(&module.files, syntax);
    module.main_seq_distance = main_seq_distance(module.abstractness, module.instability);

    let (consistency, dominant) = role_consistency(&module.files, roles);
    module.role_consistency = consistency;
    module.dominant_role = dominant;
    module.boundary_alignment = boundary_alignment(&module.files, node_community);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instability_and_distance() {
        assert_eq!(instability(0, 0), None);
        assert_eq!(instability(1, 3), Some(0.75));
        assert_eq!(main_seq_distance(0.0, None), 0.0);
        assert!((main_seq_distance(0.0, Some(0.0)) - 1.0).abs() < 1e-12);
        assert!(main_seq_distance(0.5, Some(0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_role_consistency_picks_dominant() {
        let files = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let roles = BTreeMap::from([
            ("a".to_string(), Role::Model),
            ("b".to_string(), Role::Model),
            ("c".to_string(), Role::Service),
        ]);
        let (share, role) = role_consistency(&files, &roles);
        assert!((share - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(role, Role::Model);
    }

    #[test]
    fn test_boundary_alignment() {
        let files = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        let communities = BTreeMap::from([
            ("a".to_string(), 0),
            ("b".to_string(), 0),
            ("c".to_string(), 0),
            ("d".to_string(), 1),
        ]);
        assert!((boundary_alignment(&files, &communities) - 0.75).abs() < 1e-12);
        assert_eq!(boundary_alignment(&[], &communities), 0.0);
    }
}
