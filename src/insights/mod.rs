//! Insight layer: analyzers fill the fact store, finders read it
//!
//! - `base`: `Analyzer` / `Finder` traits and error modes
//! - `ordering`: two-wave topological ordering of analyzers
//! - `validation`: phase contracts checked between waves
//! - `threshold`: tier-aware threshold checks and confidence
//! - `kernel`: runs everything and ranks the findings

pub mod analyzers;
pub mod base;
pub mod finders;
pub mod kernel;
pub mod ordering;
pub mod threshold;
pub mod validation;

pub use base::{Analyzer, ErrorMode, Finder};
pub use kernel::{InsightKernel, InsightResult, SkippedComponent};
pub use ordering::{resolve_analyzer_order, OrchestrationError};
pub use threshold::{compute_confidence, compute_hotspot_median, is_hotspot, Margin, ThresholdCheck};
pub use validation::{run_all_validations, ValidationError};
