use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::semantics::Role;

/// A group of files sharing a parent directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub path: String,
    pub files: Vec<String>,

    /// Ca: import edges entering the module from other modules
    pub afferent_coupling: usize,
    /// Ce: import edges leaving the module to other modules
    pub efferent_coupling: usize,
    pub internal_edges: usize,
    pub external_edges: usize,
    /// internal edges / n(n−1)
    pub cohesion: f64,
    /// external / (internal + external)
    pub coupling: f64,
    /// Ce / (Ca + Ce); `None` for an isolated module
    pub instability: Option<f64>,
    pub abstractness: f64,
    /// |A + I − 1|; 0 when instability is undefined
    pub main_seq_distance: f64,

    pub boundary_alignment: f64,
    pub role_consistency: f64,
    pub dominant_role: Role,

    pub layer: usize,
}

impl Module {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Modules sharing one depth in the inferred layering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub depth: usize,
    pub modules: Vec<String>,
    pub label: String,
}

/// A module importing a module above it in the layering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub source_module: String,
    pub target_module: String,
    pub source_layer: usize,
    pub target_layer: usize,
    /// File-level edges behind this module edge.
    pub edge_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub modules: BTreeMap<String, Module>,
    pub layers: Vec<Layer>,
    pub violations: Vec<Violation>,
    /// violating edges / cross-module edges
    pub violation_rate: f64,
    /// source module → target module → file-level edge count
    pub module_graph: BTreeMap<String, BTreeMap<String, usize>>,
    pub has_layering: bool,
    pub max_depth: usize,
}

impl Architecture {
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Module owning `file`, if any.
    pub fn module_of(&self, file: &str) -> Option<&Module> {
        self.modules.get(&crate::models::parent_dir(file)).filter(|m| m.files.iter().any(|f| f == file))
    }

    /// Violations whose source is `module`.
    pub fn violations_from<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.source_module == module)
    }
}
