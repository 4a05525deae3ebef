//! Signal registry and the fusion pipeline that fills the `SignalField`
//!
//! - `registry`: the closed `Signal` enum and its metadata table
//! - `models`: per-file / per-module / per-directory / global records
//! - `normalization`: tiered percentiles
//! - `composites`: raw risk and health scores
//! - `laplacian`: delta_h over the import graph
//! - `fusion`: the six type-state stages

pub mod composites;
pub mod fusion;
pub mod laplacian;
pub mod models;
pub mod normalization;
pub mod registry;

pub use fusion::FusionPipeline;
pub use models::{DirectorySignals, FileSignals, GlobalSignals, ModuleSignals, SignalField, Tier};
pub use registry::{polarity_of, registry, Polarity, Signal, SignalMeta, SignalRegistry, SignalScope, SignalType};
