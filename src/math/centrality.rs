// Graph centrality over index-based directed edges
//
// Nodes are dense indices `0..num_nodes`; edges are `(source, target)` pairs.
// Callers map file paths to indices in sorted order so results never depend
// on hash iteration order.
//
// PARALLELIZATION:
// - Betweenness: one BFS per source in parallel, partials summed in index order
// - PageRank / eigenvector: sequential power iteration (cheap per step)

use petgraph::algo::tarjan_scc as petgraph_tarjan;
use petgraph::graph::DiGraph;
use rayon::prelude::*;
use std::collections::VecDeque;

use super::{MathError, MathResult};

// ============================================================================
// VALIDATION HELPERS
// ============================================================================

/// Validate that all edges reference valid node indices.
pub(crate) fn validate_edges(edges: &[(u32, u32)], num_nodes: u32) -> MathResult<()> {
    for &(src, dst) in edges {
        if src >= num_nodes {
            return Err(MathError::NodeOutOfBounds(src, num_nodes));
        }
        if dst >= num_nodes {
            return Err(MathError::NodeOutOfBounds(dst, num_nodes));
        }
    }
    Ok(())
}

// ============================================================================
// STRONGLY CONNECTED COMPONENTS
// ============================================================================
//
// A group of nodes where every node reaches every other: a circular import.
// Tarjan's algorithm via petgraph, O(V + E).
// ============================================================================

/// All strongly connected components. Members of each SCC are sorted.
///
/// # Errors
/// - `NodeOutOfBounds` if any edge references a node >= num_nodes
pub fn find_sccs(edges: &[(u32, u32)], num_nodes: usize) -> MathResult<Vec<Vec<u32>>> {
    if num_nodes == 0 {
        return Ok(vec![]);
    }
    validate_edges(edges, num_nodes as u32)?;

    let mut graph: DiGraph<(), ()> = DiGraph::new();
    let node_indices: Vec<_> = (0..num_nodes).map(|_| graph.add_node(())).collect();
    for &(src, dst) in edges {
        graph.add_edge(node_indices[src as usize], node_indices[dst as usize], ());
    }

    Ok(petgraph_tarjan(&graph)
        .into_iter()
        .map(|scc| {
            let mut members: Vec<u32> = scc.into_iter().map(|idx| idx.index() as u32).collect();
            members.sort_unstable();
            members
        })
        .collect())
}

/// SCCs with at least `min_size` members, ordered by their smallest member.
pub fn find_cycles(edges: &[(u32, u32)], num_nodes: usize, min_size: usize) -> MathResult<Vec<Vec<u32>>> {
    let mut cycles: Vec<Vec<u32>> = find_sccs(edges, num_nodes)?
        .into_iter()
        .filter(|scc| scc.len() >= min_size)
        .collect();
    cycles.sort_by_key(|scc| scc.first().copied());
    Ok(cycles)
}

// ============================================================================
// PAGERANK
// ============================================================================
//
//   PR(v) = (1 − d)/N + d·D/N + d·Σ_{u→v} PR(u)/out(u)
//
// D is the rank mass sitting on dangling nodes (no outgoing edges). Spreading
// it uniformly keeps the vector a probability distribution on every graph.
// ============================================================================

/// PageRank by power iteration with dangling-mass redistribution.
///
/// Converges when the largest per-node change drops below `tolerance`. The
/// result sums to 1.
///
/// # Errors
/// - `InvalidParameter` if damping not in [0, 1] or tolerance <= 0
/// - `NodeOutOfBounds` if any edge references a node >= num_nodes
pub fn pagerank(
    edges: &[(u32, u32)],
    num_nodes: usize,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
) -> MathResult<Vec<f64>> {
    if num_nodes == 0 {
        return Ok(vec![]);
    }
    if !(0.0..=1.0).contains(&damping) {
        return Err(MathError::InvalidParameter(format!(
            "damping must be in [0, 1], got {}",
            damping
        )));
    }
    if tolerance <= 0.0 {
        return Err(MathError::InvalidParameter(format!(
            "tolerance must be positive, got {}",
            tolerance
        )));
    }
    validate_edges(edges, num_nodes as u32)?;

    let mut incoming: Vec<Vec<u32>> = vec![vec![]; num_nodes];
    let mut out_degree: Vec<usize> = vec![0; num_nodes];
    for &(src, dst) in edges {
        incoming[dst as usize].push(src);
        out_degree[src as usize] += 1;
    }
    let dangling: Vec<usize> = (0..num_nodes).filter(|&v| out_degree[v] == 0).collect();

    let n = num_nodes as f64;
    let mut scores = vec![1.0 / n; num_nodes];

    for _ in 0..max_iterations {
        let dangling_sum: f64 = dangling.iter().map(|&v| scores[v]).sum();
        let base = (1.0 - damping) / n + damping * dangling_sum / n;

        let new_scores: Vec<f64> = (0..num_nodes)
            .map(|node| {
                incoming[node].iter().fold(base, |acc, &src| {
                    acc + damping * scores[src as usize] / out_degree[src as usize] as f64
                })
            })
            .collect();

        let max_diff = scores
            .iter()
            .zip(&new_scores)
            .map(|(old, new)| (old - new).abs())
            .fold(0.0, f64::max);

        scores = new_scores;
        if max_diff < tolerance {
            break;
        }
    }

    Ok(scores)
}

// ============================================================================
// BETWEENNESS CENTRALITY (Brandes)
// ============================================================================
//
//   BC(v) = Σ_{s≠v≠t} σ_st(v) / σ_st
//
// One BFS per source, then dependency accumulation from the farthest nodes.
// O(V·E) for unweighted graphs.
// ============================================================================

/// Directed betweenness centrality.
///
/// With `normalized` the scores are scaled by `1/((n−1)(n−2))` when `n > 2`.
///
/// # Errors
/// - `NodeOutOfBounds` if any edge references a node >= num_nodes
pub fn betweenness_centrality(edges: &[(u32, u32)], num_nodes: usize, normalized: bool) -> MathResult<Vec<f64>> {
    if num_nodes == 0 {
        return Ok(vec![]);
    }
    validate_edges(edges, num_nodes as u32)?;

    let mut adj: Vec<Vec<u32>> = vec![vec![]; num_nodes];
    for &(src, dst) in edges {
        adj[src as usize].push(dst);
    }

    let partial_scores: Vec<Vec<f64>> = (0..num_nodes)
        .into_par_iter()
        .map(|source| {
            let mut partial = vec![0.0; num_nodes];
            let mut stack: Vec<usize> = Vec::new();
            let mut predecessors: Vec<Vec<usize>> = vec![vec![]; num_nodes];
            let mut num_paths = vec![0.0; num_nodes];
            num_paths[source] = 1.0;
            let mut distance = vec![-1i64; num_nodes];
            distance[source] = 0;

            let mut queue = VecDeque::new();
            queue.push_back(source);
            while let Some(v) = queue.pop_front() {
                stack.push(v);
                for &w in &adj[v] {
                    let w = w as usize;
                    if distance[w] < 0 {
                        distance[w] = distance[v] + 1;
                        queue.push_back(w);
                    }
                    if distance[w] == distance[v] + 1 {
                        num_paths[w] += num_paths[v];
                        predecessors[w].push(v);
                    }
                }
            }

            let mut dependency = vec![0.0; num_nodes];
            while let Some(w) = stack.pop() {
                for &v in &predecessors[w] {
                    dependency[v] += (num_paths[v] / num_paths[w]) * (1.0 + dependency[w]);
                }
                if w != source {
                    partial[w] += dependency[w];
                }
            }
            partial
        })
        .collect();

    // Summed in source order so floating-point results are reproducible
    let mut betweenness = vec![0.0; num_nodes];
    for partial in partial_scores {
        for (i, score) in partial.into_iter().enumerate() {
            betweenness[i] += score;
        }
    }

    if normalized && num_nodes > 2 {
        let scale = 1.0 / ((num_nodes - 1) * (num_nodes - 2)) as f64;
        for score in &mut betweenness {
            *score *= scale;
        }
    }

    Ok(betweenness)
}

// ============================================================================
// EIGENVECTOR CENTRALITY
// ============================================================================

/// Eigenvector centrality by power iteration over incoming neighbours.
///
/// Each step sets `x_v = Σ_{u→v} x_u` and L2-normalizes. Starting from all
/// ones keeps every score non-negative. On acyclic graphs the vector can
/// collapse to zero, which is returned as is.
pub fn eigenvector_centrality(
    edges: &[(u32, u32)],
    num_nodes: usize,
    max_iterations: usize,
    tolerance: f64,
) -> MathResult<Vec<f64>> {
    if num_nodes == 0 {
        return Ok(vec![]);
    }
    validate_edges(edges, num_nodes as u32)?;

    let mut incoming: Vec<Vec<u32>> = vec![vec![]; num_nodes];
    for &(src, dst) in edges {
        incoming[dst as usize].push(src);
    }

    let mut x = vec![1.0; num_nodes];
    for _ in 0..max_iterations {
        let mut next: Vec<f64> = incoming
            .iter()
            .map(|sources| sources.iter().map(|&u| x[u as usize]).sum())
            .collect();

        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut next {
                *v /= norm;
            }
        }

        let max_diff = x
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        x = next;
        if max_diff < tolerance {
            break;
        }
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn cycle_graph(n: usize) -> Vec<(u32, u32)> {
        (0..n).map(|i| (i as u32, ((i + 1) % n) as u32)).collect()
    }

    fn chain_graph(n: usize) -> Vec<(u32, u32)> {
        (0..n.saturating_sub(1)).map(|i| (i as u32, (i + 1) as u32)).collect()
    }

    /// Leaves 1..n all point at the hub 0
    fn star_graph(n: usize) -> Vec<(u32, u32)> {
        (1..n).map(|i| (i as u32, 0)).collect()
    }

    #[test]
    fn test_sccs_node_out_of_bounds() {
        let result = find_sccs(&[(0, 5)], 3);
        assert!(matches!(result, Err(MathError::NodeOutOfBounds(5, 3))));
    }

    #[test]
    fn test_pagerank_invalid_damping() {
        let result = pagerank(&[(0, 1)], 2, 1.5, 20, 1e-4);
        assert!(matches!(result, Err(MathError::InvalidParameter(_))));
        let result = pagerank(&[(0, 1)], 2, -0.1, 20, 1e-4);
        assert!(matches!(result, Err(MathError::InvalidParameter(_))));
    }

    #[test]
    fn test_pagerank_invalid_tolerance() {
        let result = pagerank(&[(0, 1)], 2, 0.85, 20, 0.0);
        assert!(matches!(result, Err(MathError::InvalidParameter(_))));
    }

    #[test]
    fn test_betweenness_node_out_of_bounds() {
        let result = betweenness_centrality(&[(0, 10)], 5, false);
        assert!(matches!(result, Err(MathError::NodeOutOfBounds(10, 5))));
    }

    #[test]
    fn test_pagerank_sums_to_one() {
        let graphs: Vec<(Vec<(u32, u32)>, usize)> = vec![
            (vec![], 1),
            (vec![], 4),
            (star_graph(6), 6),
            (chain_graph(7), 7),
            (cycle_graph(5), 5),
            (vec![(0, 1), (1, 2), (2, 0), (3, 0)], 5),
        ];
        for (edges, n) in graphs {
            let ranks = pagerank(&edges, n, 0.85, 100, 1e-10).unwrap();
            let total: f64 = ranks.iter().sum();
            assert!(approx_eq(total, 1.0), "sum {} for n={}", total, n);
        }
    }

    #[test]
    fn test_pagerank_star_hub_dominates() {
        let ranks = pagerank(&star_graph(5), 5, 0.85, 100, 1e-10).unwrap();
        for leaf in 1..5 {
            assert!(ranks[0] > ranks[leaf]);
        }
    }

    #[test]
    fn test_pagerank_cycle_uniform() {
        let ranks = pagerank(&cycle_graph(4), 4, 0.85, 100, 1e-10).unwrap();
        for r in ranks {
            assert!(approx_eq(r, 0.25));
        }
    }

    #[test]
    fn test_betweenness_chain_middle() {
        // 0 -> 1 -> 2: node 1 sits on the only 0->2 path
        let scores = betweenness_centrality(&chain_graph(3), 3, false).unwrap();
        assert!(approx_eq(scores[1], 1.0));
        assert!(approx_eq(scores[0], 0.0));
        let normalized = betweenness_centrality(&chain_graph(3), 3, true).unwrap();
        assert!(approx_eq(normalized[1], 0.5));
    }

    #[test]
    fn test_eigenvector_non_negative() {
        let edges = vec![(0, 1), (1, 2), (2, 0), (2, 1), (3, 1)];
        let scores = eigenvector_centrality(&edges, 4, 200, 1e-9).unwrap();
        assert!(scores.iter().all(|v| *v >= 0.0));
        assert!(scores[1] > scores[3]);
    }

    #[test]
    fn test_find_cycles_filters_singletons() {
        let edges = vec![(0, 1), (1, 0), (2, 3)];
        let cycles = find_cycles(&edges, 4, 2).unwrap();
        assert_eq!(cycles, vec![vec![0, 1]]);
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_empty_graph() {
            assert!(find_sccs(&[], 0).unwrap().is_empty());
            assert!(pagerank(&[], 0, 0.85, 20, 1e-4).unwrap().is_empty());
            assert!(betweenness_centrality(&[], 0, true).unwrap().is_empty());
            assert!(eigenvector_centrality(&[], 0, 20, 1e-4).unwrap().is_empty());
        }

        #[test]
        fn test_single_node_pagerank_is_one() {
            let ranks = pagerank(&[], 1, 0.85, 20, 1e-4).unwrap();
            assert!(approx_eq(ranks[0], 1.0));
        }

        #[test]
        fn test_self_loop_pagerank() {
            let ranks = pagerank(&[(0, 0), (0, 1)], 2, 0.85, 100, 1e-10).unwrap();
            assert!(approx_eq(ranks.iter().sum::<f64>(), 1.0));
        }

        #[test]
        fn test_duplicate_edges_betweenness() {
            let scores = betweenness_centrality(&[(0, 1), (0, 1), (1, 2)], 3, false).unwrap();
            assert!(scores.iter().all(|v| v.is_finite()));
        }

        #[test]
        fn test_deterministic_repeated_runs() {
            let edges = vec![(0, 1), (1, 2), (2, 3), (3, 1), (4, 2), (0, 4)];
            let first = betweenness_centrality(&edges, 5, true).unwrap();
            for _ in 0..5 {
                assert_eq!(betweenness_centrality(&edges, 5, true).unwrap(), first);
            }
        }
    }
}
