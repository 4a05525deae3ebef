//! Per-file semantics: role, vocabulary concepts, coherence and naming drift

pub mod analysis;
pub mod roles;

pub use analysis::{analyze_semantics, compute_file_semantics, naming_drift, todo_density, Concept, FileSemantics};
pub use roles::{classify_path, classify_role, Role};
