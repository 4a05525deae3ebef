//! Module-level architecture analysis
//!
//! Modules are parent directories. For each module this computes Martin
//! metrics, then infers layers from the contracted module graph and flags
//! imports that point up the layering.

pub mod layers;
pub mod metrics;
pub mod model;

pub use layers::{build_module_graph, infer_layers, ModuleGraph};
pub use metrics::compute_module_metrics;
pub use model::{Architecture, Layer, Module, Violation};

use std::collections::BTreeMap;

use tracing::debug;

use crate::graph::DependencyGraph;
use crate::models::{parent_dir, FileSyntax};
use crate::semantics::Role;

/// Group files into modules by parent directory.
pub fn detect_modules<'a, I: IntoIterator<Item = &'a String>>(files: I) -> BTreeMap<String, Module> {
    let mut modules: BTreeMap<String, Module> = BTreeMap::new();
    for file in files {
        let dir = parent_dir(file);
        modules
            .entry(dir.clone())
            .or_insert_with(|| Module {
                path: dir,
                ..Default::default()
            })
            .files
            .push(file.clone());
    }
    for m in modules.values_mut() {
        m.files.sort();
    }
    modules
}

pub fn analyze_architecture(
    graph: &DependencyGraph,
    roles: &BTreeMap<String, Role>,
    syntax: &BTreeMap<String, FileSyntax>,
    node_community: &BTreeMap<String, u32>,
) -> Architecture {
    let detected = detect_modules(&graph.all_nodes);
    if detected.is_empty() {
        return Architecture::default();
    }

    let file_to_module: BTreeMap<&str, &str> = graph
        .all_nodes
        .iter()
        .map(|f| (f.as_str(), parent_dir(f)))
        .filter_map(|(f, dir)| detected.get_key_value(&dir).map(|(k, _)| (f, k.as_str())))
        .collect();

    let module_graph = build_module_graph(&file_to_module, graph);
    let names: Vec<String> = detected.keys().cloned().collect();
    let (layer_of, layers, violations) = infer_layers(&names, &module_graph);

    let modules: BTreeMap<String, Module> = detected
        .iter()
        .map(|(name, module)| {
            let mut m = module.clone();
            compute_module_metrics(&mut m, &file_to_module, graph, roles, syntax, node_community);
            m.layer = layer_of.get(name).copied().unwrap_or(0);
            (name.clone(), m)
        })
        .collect();

    let cross_edges: usize = modules.values().map(|m| m.efferent_coupling).sum();
    let violating: usize = violations.iter().map(|v| v.edge_count).sum();
    let violation_rate = if cross_edges > 0 { violating as f64 / cross_edges as f64 } else { 0.0 };
    let max_depth = modules.values().map(|m| m.layer).max().unwrap_or(0);

    debug!(
        "Architecture: {} modules, {} layers, {} violations",
        modules.len(),
        layers.len(),
        violations.len()
    );

    Architecture {
        modules,
        has_layering: layers.len() >= 2,
        layers,
        violations,
        violation_rate,
        module_graph,
        max_depth,
    }
}
