// Louvain community detection
//
// Modularity:
//   Q = Σ_c [ L_c/m − (d_c/2m)² ]
//
//   m   = total undirected edge weight
//   L_c = edge weight inside community c
//   d_c = summed degree of community c
//
// Algorithm:
// 1. Local moving: each node joins the neighbouring community with the best
//    strictly positive gain
// 2. Coarsening: communities collapse into super nodes (internal weight kept
//    as self-loops)
// 3. Repeat until nothing moves
//
// DETERMINISM: nodes are visited in index order, candidate communities in
// ascending id order, and only a strictly larger gain replaces the current
// best. Identical input therefore yields identical output on every run.

use std::collections::BTreeMap;

use super::centrality::validate_edges;
use super::MathResult;

const MAX_LOCAL_PASSES: usize = 20;
const MAX_LEVELS: usize = 10;

/// Community assignment of every node plus the modularity of that partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// `assignment[node]` is the community id of `node`.
    pub assignment: Vec<u32>,
    /// Members per community, ids numbered by smallest member.
    pub communities: Vec<Vec<u32>>,
    pub modularity: f64,
}

/// Undirected weighted projection: canonical `(min, max)` pairs.
type EdgeWeights = BTreeMap<(usize, usize), f64>;

fn project_undirected(edges: &[(u32, u32)], num_nodes: usize) -> (EdgeWeights, Vec<f64>, f64) {
    let mut weights = EdgeWeights::new();
    let mut degree = vec![0.0; num_nodes];
    for &(src, dst) in edges {
        let (a, b) = (src as usize, dst as usize);
        *weights.entry((a.min(b), a.max(b))).or_insert(0.0) += 1.0;
        degree[a] += 1.0;
        degree[b] += 1.0;
    }
    let m = weights.values().sum();
    (weights, degree, m)
}

/// Phase 1. Returns the community of each level node and whether any moved.
fn local_moving(num_nodes: usize, weights: &EdgeWeights, degree: &[f64], m: f64) -> (Vec<usize>, bool) {
    let two_m = 2.0 * m;
    let mut node_comm: Vec<usize> = (0..num_nodes).collect();
    let mut sigma_tot: Vec<f64> = degree.to_vec();

    let mut neighbors: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); num_nodes];
    for (&(a, b), &w) in weights {
        *neighbors[a].entry(b).or_insert(0.0) += w;
        *neighbors[b].entry(a).or_insert(0.0) += w;
    }

    let mut any_moved = false;
    for _ in 0..MAX_LOCAL_PASSES {
        let mut moved = false;
        for node in 0..num_nodes {
            let current = node_comm[node];
            let ki = degree[node];

            let mut comm_weights: BTreeMap<usize, f64> = BTreeMap::new();
            for (&nbr, &w) in &neighbors[node] {
                // self-loop: a super node's internal weight
                if nbr == node {
                    continue;
                }
                *comm_weights.entry(node_comm[nbr]).or_insert(0.0) += w;
            }

            let ki_in_current = comm_weights.get(&current).copied().unwrap_or(0.0);
            let sigma_current = sigma_tot[current] - ki;
            let remove_cost = ki_in_current / two_m - (sigma_current * ki) / (two_m * two_m);

            let mut best_comm = current;
            let mut best_gain = 0.0;
            for (&comm, &ki_in) in &comm_weights {
                if comm == current {
                    continue;
                }
                let add_gain = ki_in / two_m - (sigma_tot[comm] * ki) / (two_m * two_m);
                let net_gain = add_gain - remove_cost;
                if net_gain > best_gain {
                    best_gain = net_gain;
                    best_comm = comm;
                }
            }

            if best_comm != current {
                sigma_tot[current] -= ki;
                sigma_tot[best_comm] += ki;
                node_comm[node] = best_comm;
                moved = true;
                any_moved = true;
            }
        }
        if !moved {
            break;
        }
    }

    (node_comm, any_moved)
}

/// Phase 2. Collapses communities into super nodes numbered by ascending id.
fn coarsen(weights: &EdgeWeights, degree: &[f64], node_comm: &[usize]) -> (EdgeWeights, Vec<f64>, Vec<Vec<usize>>) {
    let mut ids: Vec<usize> = node_comm.to_vec();
    ids.sort_unstable();
    ids.dedup();
    let index_of: BTreeMap<usize, usize> = ids.iter().enumerate().map(|(i, &c)| (c, i)).collect();

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    let mut new_degree = vec![0.0; ids.len()];
    for (node, comm) in node_comm.iter().enumerate() {
        let super_node = index_of[comm];
        members[super_node].push(node);
        new_degree[super_node] += degree[node];
    }

    let mut new_weights = EdgeWeights::new();
    for (&(a, b), &w) in weights {
        let ca = index_of[&node_comm[a]];
        let cb = index_of[&node_comm[b]];
        *new_weights.entry((ca.min(cb), ca.max(cb))).or_insert(0.0) += w;
    }

    (new_weights, new_degree, members)
}

/// Modularity of `assignment` over the undirected projection of `edges`.
pub fn modularity(edges: &[(u32, u32)], num_nodes: usize, assignment: &[u32]) -> f64 {
    let (weights, degree, m) = project_undirected(edges, num_nodes);
    modularity_of(&weights, &degree, assignment, m)
}

fn modularity_of(weights: &EdgeWeights, degree: &[f64], assignment: &[u32], m: f64) -> f64 {
    if m == 0.0 {
        return 0.0;
    }
    let internal: f64 = weights
        .iter()
        .filter(|((a, b), _)| assignment[*a] == assignment[*b])
        .map(|(_, w)| w)
        .sum();

    let mut sigma: BTreeMap<u32, f64> = BTreeMap::new();
    for (node, deg) in degree.iter().enumerate() {
        *sigma.entry(assignment[node]).or_insert(0.0) += deg;
    }
    let null_term: f64 = sigma.values().map(|s| s * s).sum::<f64>() / (4.0 * m * m);
    internal / m - null_term
}

/// Deterministic Louvain over the undirected projection of directed edges.
///
/// A graph without edges yields singleton communities and `Q = 0`.
///
/// # Errors
/// - `NodeOutOfBounds` if any edge references a node >= num_nodes
pub fn louvain(edges: &[(u32, u32)], num_nodes: usize) -> MathResult<Partition> {
    if num_nodes == 0 {
        return Ok(Partition { assignment: vec![], communities: vec![], modularity: 0.0 });
    }
    validate_edges(edges, num_nodes as u32)?;

    let (orig_weights, orig_degree, m) = project_undirected(edges, num_nodes);
    if m == 0.0 {
        return Ok(Partition {
            assignment: (0..num_nodes as u32).collect(),
            communities: (0..num_nodes as u32).map(|n| vec![n]).collect(),
            modularity: 0.0,
        });
    }

    let mut weights = orig_weights.clone();
    let mut degree = orig_degree.clone();
    // original nodes represented by each node of the current level
    let mut original_members: Vec<Vec<usize>> = (0..num_nodes).map(|n| vec![n]).collect();
    let mut node_comm: Vec<usize> = (0..num_nodes).collect();

    for _ in 0..MAX_LEVELS {
        let level_nodes = degree.len();
        let (comm, improved) = local_moving(level_nodes, &weights, &degree, m);
        node_comm = comm;
        if !improved {
            break;
        }

        let (new_weights, new_degree, super_members) = coarsen(&weights, &degree, &node_comm);
        if super_members.len() == level_nodes {
            break;
        }

        original_members = super_members
            .iter()
            .map(|level_members| {
                level_members
                    .iter()
                    .flat_map(|&n| original_members[n].iter().copied())
                    .collect()
            })
            .collect();
        weights = new_weights;
        degree = new_degree;
        node_comm = (0..original_members.len()).collect();
    }

    let mut grouped: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
    for (level_node, &comm) in node_comm.iter().enumerate() {
        grouped
            .entry(comm)
            .or_default()
            .extend(original_members[level_node].iter().map(|&n| n as u32));
    }
    let mut communities: Vec<Vec<u32>> = grouped
        .into_values()
        .map(|mut members| {
            members.sort_unstable();
            members
        })
        .collect();
    communities.sort_by_key(|members| members.first().copied());

    let mut assignment = vec![0u32; num_nodes];
    for (id, members) in communities.iter().enumerate() {
        for &n in members {
            assignment[n as usize] = id as u32;
        }
    }

    let modularity = modularity_of(&orig_weights, &orig_degree, &assignment, m);
    Ok(Partition { assignment, communities, modularity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::MathError;

    /// Two directed triangles joined by a single bridge edge
    fn two_clusters() -> Vec<(u32, u32)> {
        vec![(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)]
    }

    #[test]
    fn test_node_out_of_bounds() {
        let result = louvain(&[(0, 9)], 3);
        assert!(matches!(result, Err(MathError::NodeOutOfBounds(9, 3))));
    }

    #[test]
    fn test_no_edges_singletons() {
        let p = louvain(&[], 3).unwrap();
        assert_eq!(p.assignment, vec![0, 1, 2]);
        assert_eq!(p.modularity, 0.0);
    }

    #[test]
    fn test_finds_two_clusters() {
        let p = louvain(&two_clusters(), 6).unwrap();
        assert_eq!(p.communities.len(), 2);
        assert_eq!(p.assignment[0], p.assignment[1]);
        assert_eq!(p.assignment[1], p.assignment[2]);
        assert_eq!(p.assignment[3], p.assignment[4]);
        assert_ne!(p.assignment[0], p.assignment[3]);
        assert!(p.modularity > 0.3);
    }

    #[test]
    fn test_deterministic_five_runs() {
        let edges = vec![
            (0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 5), (5, 3),
            (6, 7), (7, 8), (8, 6), (8, 0), (5, 6), (9, 1),
        ];
        let first = louvain(&edges, 10).unwrap();
        for _ in 0..5 {
            let again = louvain(&edges, 10).unwrap();
            assert_eq!(again.assignment, first.assignment);
            assert_eq!(again.modularity.to_bits(), first.modularity.to_bits());
        }
    }

    #[test]
    fn test_path_needs_coarsening() {
        // 0-1-...-15: the first level only forms pairs, merging them takes a second level
        let edges: Vec<(u32, u32)> = (0..15).map(|i| (i, i + 1)).collect();
        let p = louvain(&edges, 16).unwrap();

        // four blocks of four: 12/15 − 226/900
        let blocks: Vec<u32> = (0..16).map(|n| n / 4).collect();
        let block_q = modularity(&edges, 16, &blocks);
        assert!((block_q - (0.8 - 226.0 / 900.0)).abs() < 1e-12);

        assert!(p.communities.len() < 8, "stuck at the first level: {:?}", p.communities);
        assert!(p.modularity >= block_q - 1e-9, "Q = {}", p.modularity);
        for members in &p.communities {
            assert!(members.windows(2).all(|w| w[1] == w[0] + 1), "non-contiguous {members:?}");
        }
    }

    #[test]
    fn test_modularity_matches_partition() {
        let p = louvain(&two_clusters(), 6).unwrap();
        let q = modularity(&two_clusters(), 6, &p.assignment);
        assert!((q - p.modularity).abs() < 1e-12);
    }

    #[test]
    fn test_community_ids_follow_smallest_member() {
        let p = louvain(&two_clusters(), 6).unwrap();
        assert_eq!(p.assignment[0], 0);
        assert_eq!(p.communities[0][0], 0);
    }
}
