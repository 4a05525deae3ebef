// Phase contracts checked between kernel stages
//
// post-scan:       files exist, paths unique, syntax ⊆ metrics
// post-structural: graph nodes ⊆ scanned files, adjacency/reverse agree
// post-fusion:     per_file keys == scanned files, finite values

use std::collections::BTreeSet;

use thiserror::Error;

use crate::error::{ErrorCode, ShannonError};
use crate::signals::{FileSignals, ModuleSignals, Signal, SignalField};
use crate::store::FactStore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("scanner produced 0 files")]
    NoFiles,

    #[error("duplicate file paths: {0:?}")]
    DuplicatePaths(Vec<String>),

    #[error("syntax records for unscanned files: {0:?}")]
    OrphanSyntax(Vec<String>),

    #[error("graph nodes not in scanned files: {0:?}")]
    UnknownGraphNodes(Vec<String>),

    #[error("edge {0} -> {1} missing from reverse adjacency")]
    MissingReverse(String, String),

    #[error("reverse edge {0} <- {1} missing from forward adjacency")]
    MissingForward(String, String),

    #[error("signal field missing files: {0:?}")]
    MissingFiles(Vec<String>),

    #[error("signal field has unscanned files: {0:?}")]
    ExtraFiles(Vec<String>),

    #[error("non-finite {signal} for {entity}")]
    NonFinite { entity: String, signal: String },
}

impl From<ValidationError> for ShannonError {
    fn from(err: ValidationError) -> Self {
        let code = match err {
            ValidationError::MissingReverse(..) | ValidationError::MissingForward(..) => ErrorCode::SC802,
            _ => ErrorCode::SC800,
        };
        ShannonError::fatal(code, err.to_string())
    }
}

fn first_few(mut v: Vec<String>) -> Vec<String> {
    v.truncate(10);
    v
}

pub fn validate_post_scan(store: &FactStore) -> Result<(), ValidationError> {
    let metrics = store.file_metrics.get().map(Vec::as_slice).unwrap_or_default();
    if metrics.is_empty() {
        return Err(ValidationError::NoFiles);
    }

    let mut seen = BTreeSet::new();
    let mut dupes = BTreeSet::new();
    for m in metrics {
        if !seen.insert(m.path.as_str()) {
            dupes.insert(m.path.clone());
        }
    }
    if !dupes.is_empty() {
        return Err(ValidationError::DuplicatePaths(first_few(dupes.into_iter().collect())));
    }

    if let Some(syntax) = store.file_syntax.get() {
        let extra: Vec<String> = syntax.keys().filter(|p| !seen.contains(p.as_str())).cloned().collect();
        if !extra.is_empty() {
            return Err(ValidationError::OrphanSyntax(first_few(extra)));
        }
    }
    Ok(())
}

pub fn validate_post_structural(store: &FactStore) -> Result<(), ValidationError> {
    let Some(structural) = store.structural.get() else {
        return Ok(());
    };
    let graph = &structural.graph;
    let scanned = store.file_set();

    let unknown: Vec<String> = graph.all_nodes.iter().filter(|n| !scanned.contains(*n)).cloned().collect();
    if !unknown.is_empty() {
        return Err(ValidationError::UnknownGraphNodes(first_few(unknown)));
    }

    for (src, dst) in graph.edges() {
        if !graph.importers(dst).iter().any(|s| s == src) {
            return Err(ValidationError::MissingReverse(src.to_string(), dst.to_string()));
        }
    }
    for (dst, sources) in &graph.reverse {
        for src in sources {
            if !graph.imports(src).iter().any(|t| t == dst) {
                return Err(ValidationError::MissingForward(dst.clone(), src.clone()));
            }
        }
    }
    Ok(())
}

fn check_file_finite(fs: &FileSignals) -> Result<(), ValidationError> {
    let values = Signal::ALL.iter().filter_map(|s| fs.numeric(*s).map(|v| (*s, v)));
    for (signal, v) in values.chain(fs.percentiles.iter().map(|(s, v)| (*s, *v))) {
        if !v.is_finite() {
            return Err(ValidationError::NonFinite {
                entity: fs.path.clone(),
                signal: signal.to_string(),
            });
        }
    }
    Ok(())
}

fn check_module_finite(ms: &ModuleSignals) -> Result<(), ValidationError> {
    let values = Signal::ALL.iter().filter_map(|s| ms.numeric(*s).map(|v| (*s, v)));
    for (signal, v) in values.chain(ms.percentiles.iter().map(|(s, v)| (*s, *v))) {
        if !v.is_finite() {
            return Err(ValidationError::NonFinite {
                entity: ms.path.clone(),
                signal: signal.to_string(),
            });
        }
    }
    Ok(())
}

/// Checks a fused field against the scanned file set.
pub fn validate_field(field: &SignalField, scanned: &BTreeSet<String>) -> Result<(), ValidationError> {
    let missing: Vec<String> = scanned.iter().filter(|p| !field.per_file.contains_key(*p)).cloned().collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFiles(first_few(missing)));
    }
    let extra: Vec<String> = field.per_file.keys().filter(|p| !scanned.contains(*p)).cloned().collect();
    if !extra.is_empty() {
        return Err(ValidationError::ExtraFiles(first_few(extra)));
    }

    for fs in field.per_file.values() {
        check_file_finite(fs)?;
    }
    for ms in field.per_module.values() {
        check_module_finite(ms)?;
    }
    let g = &field.global_signals;
    for signal in Signal::ALL {
        if let Some(v) = g.numeric(*signal) {
            if !v.is_finite() {
                return Err(ValidationError::NonFinite {
                    entity: "codebase".to_string(),
                    signal: signal.to_string(),
                });
            }
        }
    }
    for (path, d) in &field.delta_h {
        if !d.is_finite() {
            return Err(ValidationError::NonFinite {
                entity: path.clone(),
                signal: "delta_h".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_post_fusion(store: &FactStore) -> Result<(), ValidationError> {
    match store.signal_field.get() {
        Some(field) => validate_field(field, &store.file_set()),
        None => Ok(()),
    }
}

/// Runs every checkpoint and collects failures instead of stopping at the
/// first one.
pub fn run_all_validations(store: &FactStore) -> Vec<String> {
    [
        validate_post_scan(store),
        validate_post_structural(store),
        validate_post_fusion(store),
    ]
    .into_iter()
    .filter_map(Result::err)
    .map(|e| e.to_string())
    .collect()
}
