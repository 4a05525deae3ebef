//! Shannon Insight - quantitative code-quality analysis engine
//!
//! Turns scanner records (file metrics, syntax, contents) and commit
//! history into findings backed by evidence:
//!
//! ```text
//! scan records ──> FactStore ──> analyzers (graph, temporal, semantics,
//!                                architecture, spectral, clones)
//!                           ──> signal fusion ──> SignalField
//!                           ──> finders ──> findings ──> snapshot / diff
//! ```

pub mod architecture;
pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod insights;
pub mod math;
pub mod models;
pub mod persistence;
pub mod semantics;
pub mod signals;
pub mod store;
pub mod temporal;

pub use config::AnalysisSettings;
pub use error::{ErrorCode, ShannonError, ShannonResult};
pub use insights::{InsightKernel, InsightResult};
pub use models::{Evidence, Finding, FindingScope};
pub use store::FactStore;
