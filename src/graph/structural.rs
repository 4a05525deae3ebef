// Structural analysis of the dependency graph
//
// Path-keyed wrappers around the index-based algorithms in `math`. Nodes are
// indexed in sorted path order, so every result is independent of insertion
// and hash order.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use super::model::{Community, CycleGroup, DependencyGraph, GraphAnalysis};
use crate::config::AnalysisSettings;
use crate::error::ShannonResult;
use crate::math::centrality::{betweenness_centrality, find_cycles, pagerank};
use crate::math::community::louvain;
use crate::math::gini::gini_coefficient;
use crate::semantics::Role;

// ============================================================================
// DEPTH
// ============================================================================

/// BFS hop count from the nearest entry point over import edges.
///
/// Every node mentioned in `adjacency` gets a value; unreachable nodes get
/// -1. Each node is expanded at most once, so cycles terminate.
pub fn compute_dag_depth(adjacency: &BTreeMap<String, Vec<String>>, entry_points: &BTreeSet<String>) -> BTreeMap<String, i64> {
    let mut depth: BTreeMap<String, i64> = adjacency
        .iter()
        .flat_map(|(src, targets)| std::iter::once(src).chain(targets.iter()))
        .map(|n| (n.clone(), -1))
        .collect();

    let mut queue = VecDeque::new();
    for entry in entry_points {
        if let Some(d) = depth.get_mut(entry) {
            *d = 0;
            queue.push_back((entry.as_str(), 0_i64));
        }
    }

    while let Some((node, d)) = queue.pop_front() {
        for next in adjacency.get(node).into_iter().flatten() {
            if let Some(slot) = depth.get_mut(next) {
                if *slot == -1 {
                    *slot = d + 1;
                    queue.push_back((next.as_str(), d + 1));
                }
            }
        }
    }
    depth
}

/// Depth roots: ENTRY_POINT files, or when there are none, files that
/// import something and are imported by nothing.
pub fn entry_points(graph: &DependencyGraph, roles: &BTreeMap<String, Role>) -> BTreeSet<String> {
    let declared: BTreeSet<String> = graph
        .all_nodes
        .iter()
        .filter(|n| roles.get(*n) == Some(&Role::EntryPoint))
        .cloned()
        .collect();
    if !declared.is_empty() {
        return declared;
    }
    graph
        .all_nodes
        .iter()
        .filter(|n| graph.in_degree(n) == 0 && graph.out_degree(n) > 0)
        .cloned()
        .collect()
}

// ============================================================================
// ORPHANS / GINI / BLAST RADIUS
// ============================================================================

/// Files nothing imports, except entry points and tests.
pub fn find_orphans(graph: &DependencyGraph, roles: &BTreeMap<String, Role>) -> BTreeSet<String> {
    graph
        .all_nodes
        .iter()
        .filter(|n| graph.in_degree(n) == 0)
        .filter(|n| !matches!(roles.get(*n), Some(Role::EntryPoint) | Some(Role::Test)))
        .cloned()
        .collect()
}

/// Uncorrected Gini of the PageRank distribution.
pub fn centrality_gini(pagerank: &BTreeMap<String, f64>) -> f64 {
    if pagerank.len() <= 1 {
        return 0.0;
    }
    let values: Vec<f64> = pagerank.values().copied().collect();
    gini_coefficient(&values, false).unwrap_or(0.0)
}

/// Files transitively depending on any of `start` (excluding `start`).
pub fn blast_radius<'a, I>(reverse: &BTreeMap<String, Vec<String>>, start: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let start: BTreeSet<&str> = start.into_iter().collect();
    let mut seen: BTreeSet<&str> = start.clone();
    let mut queue: VecDeque<&str> = start.iter().copied().collect();

    while let Some(node) = queue.pop_front() {
        for importer in reverse.get(node).into_iter().flatten() {
            if seen.insert(importer.as_str()) {
                queue.push_back(importer.as_str());
            }
        }
    }
    seen.into_iter()
        .filter(|n| !start.contains(n))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// FULL ANALYSIS
// ============================================================================

fn by_path<T: Copy>(nodes: &[String], values: &[T]) -> BTreeMap<String, T> {
    nodes.iter().cloned().zip(values.iter().copied()).collect()
}

/// Runs every structural algorithm over `graph`.
pub fn analyze_structure(
    graph: &DependencyGraph,
    roles: &BTreeMap<String, Role>,
    settings: &AnalysisSettings,
) -> ShannonResult<GraphAnalysis> {
    let (nodes, edges) = graph.indexed();
    let n = nodes.len();

    let ranks = pagerank(
        &edges,
        n,
        settings.pagerank_damping,
        settings.pagerank_iterations,
        settings.pagerank_tolerance,
    )?;
    let betweenness = betweenness_centrality(&edges, n, true)?;

    let cycles = find_cycles(&edges, n, 2)?
        .into_iter()
        .map(|members| {
            let set: BTreeSet<u32> = members.iter().copied().collect();
            let internal_edge_count = edges
                .iter()
                .filter(|(s, t)| set.contains(s) && set.contains(t))
                .count();
            CycleGroup {
                nodes: members.iter().map(|&i| nodes[i as usize].clone()).collect(),
                internal_edge_count,
            }
        })
        .collect();

    let partition = louvain(&edges, n)?;
    let communities = partition
        .communities
        .iter()
        .enumerate()
        .map(|(id, members)| Community {
            id: id as u32,
            members: members.iter().map(|&i| nodes[i as usize].clone()).collect(),
        })
        .collect();

    let pagerank_map = by_path(&nodes, &ranks);
    let analysis = GraphAnalysis {
        centrality_gini: centrality_gini(&pagerank_map),
        pagerank: pagerank_map,
        betweenness: by_path(&nodes, &betweenness),
        in_degree: nodes.iter().map(|p| (p.clone(), graph.in_degree(p))).collect(),
        out_degree: nodes.iter().map(|p| (p.clone(), graph.out_degree(p))).collect(),
        blast_radius_size: nodes
            .iter()
            .map(|p| (p.clone(), blast_radius(&graph.reverse, [p.as_str()]).len()))
            .collect(),
        cycles,
        communities,
        node_community: by_path(&nodes, &partition.assignment),
        modularity: partition.modularity,
        depth: compute_dag_depth(&graph.adjacency, &entry_points(graph, roles)),
        orphans: find_orphans(graph, roles),
    };

    debug!(
        "Structural analysis: {} nodes, {} cycles, {} communities (Q={:.3})",
        n,
        analysis.cycles.len(),
        analysis.communities.len(),
        analysis.modularity
    );
    Ok(analysis)
}
