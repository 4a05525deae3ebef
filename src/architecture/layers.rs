// Layer inference over the module graph
//
// File edges are contracted to module edges. A DFS in sorted module order
// marks back edges; the remaining edges form a DAG whose longest path to a
// sink gives each module its layer (0 = imports nothing). Any module edge
// pointing to a strictly higher layer is a violation, which includes every
// back edge.

use std::collections::BTreeMap;

use super::model::{Layer, Violation};
use crate::graph::DependencyGraph;

pub type ModuleGraph = BTreeMap<String, BTreeMap<String, usize>>;

/// Contracts file edges into weighted module edges. Intra-module edges and
/// files without a module are dropped.
pub fn build_module_graph(file_to_module: &BTreeMap<&str, &str>, graph: &DependencyGraph) -> ModuleGraph {
    let mut out: ModuleGraph = BTreeMap::new();
    for (src, dst) in graph.edges() {
        let (Some(a), Some(b)) = (file_to_module.get(src), file_to_module.get(dst)) else {
            continue;
        };
        if a != b {
            *out.entry(a.to_string()).or_default().entry(b.to_string()).or_insert(0) += 1;
        }
    }
    out
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    New,
    Active,
    Done,
}

/// DFS post-order and the set of back edges, both deterministic.
fn dfs_order<'a>(modules: &'a [String], graph: &'a ModuleGraph) -> (Vec<&'a str>, Vec<(&'a str, &'a str)>) {
    let mut marks: BTreeMap<&str, Mark> = modules.iter().map(|m| (m.as_str(), Mark::New)).collect();
    let mut post = Vec::with_capacity(modules.len());
    let mut back = Vec::new();

    let targets = |m: &str| -> Vec<&'a str> {
        graph
            .get(m)
            .map(|t| t.keys().map(String::as_str).collect())
            .unwrap_or_default()
    };

    for root in modules {
        if marks.get(root.as_str()) != Some(&Mark::New) {
            continue;
        }
        marks.insert(root.as_str(), Mark::Active);
        let mut stack: Vec<(&str, Vec<&str>, usize)> = vec![(root.as_str(), targets(root.as_str()), 0)];

        while let Some((node, next, idx)) = stack.last_mut() {
            if *idx == next.len() {
                marks.insert(*node, Mark::Done);
                post.push(*node);
                stack.pop();
                continue;
            }
            let target = next[*idx];
            *idx += 1;
            let from = *node;
            match marks.get(target).copied() {
                Some(Mark::New) => {
                    marks.insert(target, Mark::Active);
                    stack.push((target, targets(target), 0));
                }
                Some(Mark::Active) => back.push((from, target)),
                _ => {}
            }
        }
    }
    (post, back)
}

fn label(depth: usize, max_depth: usize) -> &'static str {
    if depth == 0 {
        "foundation"
    } else if depth == max_depth {
        "entry"
    } else if depth + 1 == max_depth {
        "service"
    } else {
        "logic"
    }
}

/// Layer per module, grouped layers, and violations.
pub fn infer_layers(modules: &[String], graph: &ModuleGraph) -> (BTreeMap<String, usize>, Vec<Layer>, Vec<Violation>) {
    let (post, back) = dfs_order(modules, graph);

    let mut layer: BTreeMap<&str, usize> = BTreeMap::new();
    for m in post {
        let depth = graph
            .get(m)
            .into_iter()
            .flat_map(|t| t.keys())
            .filter(|t| !back.contains(&(m, t.as_str())))
            .filter_map(|t| layer.get(t.as_str()))
            .map(|l| l + 1)
            .max()
            .unwrap_or(0);
        layer.insert(m, depth);
    }

    let max_depth = layer.values().copied().max().unwrap_or(0);
    let mut by_depth: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (m, d) in &layer {
        by_depth.entry(*d).or_default().push(m.to_string());
    }
    let layers = (0..=max_depth)
        .filter(|_| !layer.is_empty())
        .map(|d| Layer {
            depth: d,
            modules: by_depth.remove(&d).unwrap_or_default(),
            label: label(d, max_depth).to_string(),
        })
        .collect();

    let mut violations = Vec::new();
    for (src, targets) in graph {
        let Some(&src_layer) = layer.get(src.as_str()) else {
            continue;
        };
        for (dst, count) in targets {
            match layer.get(dst.as_str()) {
                Some(&dst_layer) if src_layer < dst_layer => violations.push(Violation {
                    source_module: src.clone(),
                    target_module: dst.clone(),
                    source_layer: src_layer,
                    target_layer: dst_layer,
                    edge_count: *count,
                }),
                _ => {}
            }
        }
    }

    let layer = layer.into_iter().map(|(m, d)| (m.to_string(), d)).collect();
    (layer, layers, violations)
}
