//! Built-in analyzers
//!
//! Wave 1 fills the analysis slots from scanner records and git history.
//! Wave 2 holds only signal fusion, which reads everything else.
//!
//! ```text
//! FileSyntax ──> semantics ──> Semantics, Roles
//! FileMetrics, Roles ──> structural ──> Structural ──> spectral, architecture
//! FileContents, Roles ──> clones ──> ClonePairs
//! FileMetrics ──> temporal ──> GitHistory, Churn, Cochange ──> author_distance
//! (wave 2) fusion ──> SignalField
//! ```

mod architecture;
mod clones;
mod fusion;
mod semantic;
mod structural;
mod temporal;

pub use architecture::ArchitectureAnalyzer;
pub use clones::CloneAnalyzer;
pub use fusion::SignalFusionAnalyzer;
pub use semantic::SemanticAnalyzer;
pub use structural::{SpectralAnalyzer, StructuralAnalyzer};
pub use temporal::{AuthorDistanceAnalyzer, TemporalAnalyzer};

use std::path::PathBuf;

use super::base::Analyzer;
use crate::config::AnalysisSettings;

/// Every built-in analyzer. `repo` enables git extraction when the store
/// has no preloaded history.
pub fn builtin_analyzers(settings: &AnalysisSettings, repo: Option<PathBuf>) -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(SemanticAnalyzer),
        Box::new(StructuralAnalyzer::new(settings.clone())),
        Box::new(SpectralAnalyzer::new(settings.spectral_max_nodes)),
        Box::new(CloneAnalyzer::new(settings.clone_threshold)),
        Box::new(TemporalAnalyzer::new(repo, settings.clone())),
        Box::new(AuthorDistanceAnalyzer),
        Box::new(ArchitectureAnalyzer),
        Box::new(SignalFusionAnalyzer::new(settings.clone())),
    ]
}
