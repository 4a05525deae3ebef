//! Dependency graph and structural analysis
//!
//! The graph is file-level: an edge `a -> b` means `a` imports `b`. All maps
//! are ordered by path so every algorithm sees nodes in the same order on
//! every run.
//!
//! - `model`: `DependencyGraph`, `GraphAnalysis` and the pairwise records
//! - `builder`: import resolution against the scanned path set
//! - `structural`: centrality, cycles, communities, depth, orphans, blast radius
//! - `clones`: NCD clone pairs
//! - `author_distance`: sparse pairwise author-share distance
//! - `spectral`: Laplacian eigenvalues of the undirected graph

pub mod author_distance;
pub mod builder;
pub mod clones;
pub mod model;
pub mod spectral;
pub mod structural;

pub use author_distance::compute_author_distances;
pub use builder::build_dependency_graph;
pub use clones::{compute_clone_ratio, detect_clones};
pub use model::{AuthorDistance, ClonePair, Community, CycleGroup, DependencyGraph, GraphAnalysis, SpectralSummary, StructuralResult};
pub use spectral::compute_spectral_summary;
pub use structural::{analyze_structure, blast_radius, centrality_gini, compute_dag_depth, find_orphans};
