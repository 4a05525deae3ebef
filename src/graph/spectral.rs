// Laplacian spectrum of the undirected import graph
//
// L = D − A over the symmetrized adjacency. The number of (near) zero
// eigenvalues is the number of connected components; the second smallest
// eigenvalue of a connected graph is its algebraic connectivity (Fiedler
// value). For disconnected graphs the Fiedler value is taken on the largest
// component.

use nalgebra::{DMatrix, SymmetricEigen};
use std::collections::BTreeSet;

use tracing::debug;

use super::model::{DependencyGraph, SpectralSummary};

const ZERO_TOLERANCE: f64 = 1e-8;
const STORED_EIGENVALUES: usize = 20;

fn laplacian(n: usize, edges: &[(u32, u32)]) -> DMatrix<f64> {
    let mut adj = DMatrix::<f64>::zeros(n, n);
    for &(s, t) in edges {
        let (s, t) = (s as usize, t as usize);
        if s != t {
            adj[(s, t)] = 1.0;
            adj[(t, s)] = 1.0;
        }
    }
    let mut lap = -adj.clone();
    for i in 0..n {
        lap[(i, i)] = adj.row(i).sum();
    }
    lap
}

fn sorted_eigenvalues(matrix: DMatrix<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = SymmetricEigen::new(matrix).eigenvalues.iter().copied().collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Connected components of the undirected graph, each sorted.
fn components(n: usize, edges: &[(u32, u32)]) -> Vec<Vec<usize>> {
    let mut neighbours: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for &(s, t) in edges {
        neighbours[s as usize].insert(t as usize);
        neighbours[t as usize].insert(s as usize);
    }
    let mut seen = vec![false; n];
    let mut out = Vec::new();
    for start in 0..n {
        if seen[start] {
            continue;
        }
        let mut stack = vec![start];
        let mut members = Vec::new();
        seen[start] = true;
        while let Some(node) = stack.pop() {
            members.push(node);
            for &next in &neighbours[node] {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
        members.sort_unstable();
        out.push(members);
    }
    out
}

fn fiedler_of_largest(n: usize, edges: &[(u32, u32)]) -> f64 {
    // first largest in index order keeps ties deterministic
    let Some(largest) = components(n, edges)
        .into_iter()
        .reduce(|best, c| if c.len() > best.len() { c } else { best })
    else {
        return 0.0;
    };
    if largest.len() < 3 {
        return 0.0;
    }
    let mut local = vec![usize::MAX; n];
    for (i, &node) in largest.iter().enumerate() {
        local[node] = i;
    }
    let sub_edges: Vec<(u32, u32)> = edges
        .iter()
        .filter(|(s, t)| local[*s as usize] != usize::MAX && local[*t as usize] != usize::MAX)
        .map(|&(s, t)| (local[s as usize] as u32, local[t as usize] as u32))
        .collect();
    sorted_eigenvalues(laplacian(largest.len(), &sub_edges))
        .get(1)
        .copied()
        .unwrap_or(0.0)
}

/// Spectral summary, or `None` when the graph has fewer than three nodes
/// or more than `max_nodes`.
pub fn compute_spectral_summary(graph: &DependencyGraph, max_nodes: usize) -> Option<SpectralSummary> {
    let n = graph.node_count();
    if n < 3 {
        return None;
    }
    if n > max_nodes {
        debug!("Spectral analysis skipped: {} nodes exceeds cap of {}", n, max_nodes);
        return None;
    }
    let (_, edges) = graph.indexed();
    let eigenvalues = sorted_eigenvalues(laplacian(n, &edges));
    let num_components = eigenvalues.iter().filter(|v| v.abs() < ZERO_TOLERANCE).count();

    let fiedler_value = if num_components <= 1 {
        eigenvalues.get(1).copied().unwrap_or(0.0)
    } else {
        fiedler_of_largest(n, &edges)
    };

    let non_zero: Vec<f64> = eigenvalues.iter().copied().filter(|v| *v > ZERO_TOLERANCE).collect();
    let spectral_gap = match non_zero.as_slice() {
        [first, second, ..] if *second > 0.0 => first / second,
        _ => 0.0,
    };

    Some(SpectralSummary {
        fiedler_value: fiedler_value.max(0.0),
        num_components,
        eigenvalues: eigenvalues.into_iter().take(STORED_EIGENVALUES).collect(),
        spectral_gap,
    })
}
