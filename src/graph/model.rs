use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// File-level import graph.
///
/// Every scanned file is a key of both `adjacency` and `reverse`, even
/// when it has no edges. Edge lists are sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// importer -> imported files
    pub adjacency: BTreeMap<String, Vec<String>>,
    /// imported -> importers
    pub reverse: BTreeMap<String, Vec<String>>,
    pub all_nodes: BTreeSet<String>,
    /// file -> import strings that matched no scanned file
    pub unresolved_imports: BTreeMap<String, Vec<String>>,
    pub edge_count: usize,
}

impl DependencyGraph {
    /// Graph over `nodes` with the given `(importer, imported)` edges.
    ///
    /// Self edges and edges touching unknown nodes are dropped.
    pub fn from_edges<I, S>(nodes: I, edges: &[(S, S)]) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        S: AsRef<str>,
    {
        let all_nodes: BTreeSet<String> = nodes.into_iter().map(Into::into).collect();
        let mut graph = Self {
            adjacency: all_nodes.iter().map(|n| (n.clone(), Vec::new())).collect(),
            reverse: all_nodes.iter().map(|n| (n.clone(), Vec::new())).collect(),
            all_nodes,
            ..Default::default()
        };
        for (src, dst) in edges {
            graph.add_edge(src.as_ref(), dst.as_ref());
        }
        graph
    }

    /// Adds `src -> dst`. Returns false for self edges, unknown nodes and
    /// duplicates.
    pub fn add_edge(&mut self, src: &str, dst: &str) -> bool {
        if src == dst || !self.all_nodes.contains(src) || !self.all_nodes.contains(dst) {
            return false;
        }
        let targets = self.adjacency.entry(src.to_string()).or_default();
        match targets.binary_search_by(|t| t.as_str().cmp(dst)) {
            Ok(_) => return false,
            Err(pos) => targets.insert(pos, dst.to_string()),
        }
        let sources = self.reverse.entry(dst.to_string()).or_default();
        if let Err(pos) = sources.binary_search_by(|s| s.as_str().cmp(src)) {
            sources.insert(pos, src.to_string());
        }
        self.edge_count += 1;
        true
    }

    pub fn node_count(&self) -> usize {
        self.all_nodes.len()
    }

    pub fn out_degree(&self, path: &str) -> usize {
        self.adjacency.get(path).map_or(0, Vec::len)
    }

    pub fn in_degree(&self, path: &str) -> usize {
        self.reverse.get(path).map_or(0, Vec::len)
    }

    /// Imported files of `path`.
    pub fn imports(&self, path: &str) -> &[String] {
        self.adjacency.get(path).map_or(&[], Vec::as_slice)
    }

    /// Files importing `path`.
    pub fn importers(&self, path: &str) -> &[String] {
        self.reverse.get(path).map_or(&[], Vec::as_slice)
    }

    /// Undirected neighbourhood: importers ∪ imports.
    pub fn neighbors(&self, path: &str) -> BTreeSet<&str> {
        self.imports(path)
            .iter()
            .chain(self.importers(path))
            .map(String::as_str)
            .filter(|n| *n != path)
            .collect()
    }

    /// All edges in (source, target) order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.adjacency
            .iter()
            .flat_map(|(src, targets)| targets.iter().map(move |t| (src.as_str(), t.as_str())))
    }

    /// Sorted node list plus edges expressed as indices into it.
    pub fn indexed(&self) -> (Vec<String>, Vec<(u32, u32)>) {
        let nodes: Vec<String> = self.all_nodes.iter().cloned().collect();
        let index: FxHashMap<&str, u32> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i as u32))
            .collect();
        let edges = self
            .edges()
            .filter_map(|(s, t)| Some((*index.get(s)?, *index.get(t)?)))
            .collect();
        (nodes, edges)
    }

    /// Total number of unresolved import strings.
    pub fn unresolved_count(&self) -> usize {
        self.unresolved_imports.values().map(Vec::len).sum()
    }
}

/// A strongly connected component of size > 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleGroup {
    pub nodes: Vec<String>,
    pub internal_edge_count: usize,
}

/// A Louvain community. Ids are dense and follow the smallest member path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: u32,
    pub members: Vec<String>,
}

/// Everything structural analysis derives from the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphAnalysis {
    pub pagerank: BTreeMap<String, f64>,
    /// Normalized to `[0, 1]`.
    pub betweenness: BTreeMap<String, f64>,
    pub in_degree: BTreeMap<String, usize>,
    pub out_degree: BTreeMap<String, usize>,
    /// Number of files transitively depending on each file.
    pub blast_radius_size: BTreeMap<String, usize>,
    pub cycles: Vec<CycleGroup>,
    pub communities: Vec<Community>,
    pub node_community: BTreeMap<String, u32>,
    pub modularity: f64,
    /// BFS distance from the nearest entry point, -1 when unreachable.
    pub depth: BTreeMap<String, i64>,
    pub orphans: BTreeSet<String>,
    pub centrality_gini: f64,
}

impl GraphAnalysis {
    pub fn is_orphan(&self, path: &str) -> bool {
        self.orphans.contains(path)
    }

    /// Number of files that sit in some import cycle.
    pub fn files_in_cycles(&self) -> usize {
        self.cycles.iter().map(|c| c.nodes.len()).sum()
    }
}

/// Graph plus its analysis, stored together in one slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralResult {
    pub graph: DependencyGraph,
    pub analysis: GraphAnalysis,
}

/// Two files whose contents are near duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClonePair {
    pub file_a: String,
    pub file_b: String,
    pub ncd: f64,
    pub size_a: usize,
    pub size_b: usize,
}

/// Author-share distance of two files that share at least one author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorDistance {
    pub file_a: String,
    pub file_b: String,
    /// `1 − Σ min(share_a, share_b)` over shared authors.
    pub distance: f64,
    pub shared_authors: Vec<String>,
}

/// Laplacian spectrum of the undirected import graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralSummary {
    /// Algebraic connectivity of the largest component.
    pub fiedler_value: f64,
    pub num_components: usize,
    /// Ascending, capped at the first 20.
    pub eigenvalues: Vec<f64>,
    /// λ₂ / λ₃ over non-zero eigenvalues, 0 when undefined.
    pub spectral_gap: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edges_dedupes_and_drops_self_edges() {
        let g = DependencyGraph::from_edges(["a", "b", "c"], &[("a", "b"), ("a", "b"), ("b", "b"), ("a", "z")]);
        assert_eq!(g.edge_count, 1);
        assert_eq!(g.imports("a"), ["b".to_string()]);
        assert_eq!(g.importers("b"), ["a".to_string()]);
        assert!(g.adjacency.contains_key("c"));
    }

    #[test]
    fn test_indexed_follows_sorted_nodes() {
        let g = DependencyGraph::from_edges(["c", "a", "b"], &[("c", "a")]);
        let (nodes, edges) = g.indexed();
        assert_eq!(nodes, vec!["a", "b", "c"]);
        assert_eq!(edges, vec![(2, 0)]);
    }

    #[test]
    fn test_neighbors_are_undirected() {
        let g = DependencyGraph::from_edges(["a", "b", "c"], &[("a", "b"), ("c", "a")]);
        let n: Vec<&str> = g.neighbors("a").into_iter().collect();
        assert_eq!(n, vec!["b", "c"]);
        assert!(g.neighbors("zzz").is_empty());
    }
}
