use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::insights::threshold::{compute_confidence, Margin};
use crate::models::{Effort, Evidence, Finding, FindingScope};
use crate::signals::{Polarity, SignalField};
use crate::store::FactStore;

const DEPTH_THRESHOLD: i64 = 1;
const GLUE_DEFICIT_THRESHOLD: f64 = 0.5;
const BASE_SEVERITY: f64 = 0.6;

/// No layering: every reachable file sits within one import of an entry
/// point and little code composes the leaves.
pub struct FlatArchitectureFinder;

fn evaluate(field: &SignalField) -> Option<Finding> {
    let max_depth = field.per_file.values().map(|f| f.depth).filter(|d| *d >= 0).max()?;
    let g = &field.global_signals;
    if max_depth > DEPTH_THRESHOLD || g.glue_deficit <= GLUE_DEFICIT_THRESHOLD {
        return None;
    }
    let confidence = compute_confidence(&[Margin::new(g.glue_deficit, GLUE_DEFICIT_THRESHOLD, Polarity::HighIsBad)]);
    Some(
        Finding::new("flat_architecture", BASE_SEVERITY, "Flat architecture: no layering or orchestration")
            .with_evidence(vec![
                Evidence::new("max_depth", max_depth as f64, 0.0, format!("Max import depth = {max_depth} (flat)")),
                Evidence::new(
                    "glue_deficit",
                    g.glue_deficit,
                    0.0,
                    format!("Glue deficit = {:.2} (missing orchestration)", g.glue_deficit),
                ),
                Evidence::new("orphan_ratio", g.orphan_ratio, 0.0, format!("Orphan ratio = {:.2}", g.orphan_ratio)),
            ])
            .with_suggestion("Add a composition layer. Many leaf modules exist but nothing orchestrates them.")
            .with_confidence(confidence)
            .with_effort(Effort::High)
            .with_scope(FindingScope::Codebase),
    )
}

impl Finder for FlatArchitectureFinder {
    fn name(&self) -> &'static str {
        "flat_architecture"
    }

    fn description(&self) -> &'static str {
        "Codebases with no import layering and little glue code"
    }

    fn scope(&self) -> FindingScope {
        FindingScope::Codebase
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        Ok(evaluate(store.signal_field.value()?).into_iter().collect())
    }
}
