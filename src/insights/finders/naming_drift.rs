use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::insights::threshold::{compute_confidence, Margin};
use crate::models::{Effort, Evidence, Finding};
use crate::signals::{FileSignals, Polarity, Signal};
use crate::store::FactStore;

const DRIFT_THRESHOLD: f64 = 0.7;
const BASE_SEVERITY: f64 = 0.45;

/// Files whose name says one thing and whose identifiers say another.
pub struct NamingDriftFinder;

fn evaluate(fs: &FileSignals) -> Option<Finding> {
    if fs.naming_drift <= DRIFT_THRESHOLD {
        return None;
    }
    let confidence = compute_confidence(&[Margin::new(fs.naming_drift, DRIFT_THRESHOLD, Polarity::HighIsBad)]);
    Some(
        Finding::new("naming_drift", BASE_SEVERITY, format!("Naming drift: {} (content doesn't match name)", fs.path))
            .with_files(vec![fs.path.clone()])
            .with_evidence(vec![
                Evidence::new(
                    "naming_drift",
                    fs.naming_drift,
                    fs.percentile(Signal::NamingDrift).unwrap_or(0.0),
                    format!("Drift = {:.2} (filename vs content mismatch)", fs.naming_drift),
                ),
                Evidence::new(
                    "concept_count",
                    fs.concept_count as f64,
                    0.0,
                    format!("{} concepts in content", fs.concept_count),
                ),
            ])
            .with_suggestion("Rename the file to match its content, or extract the mismatched logic.")
            .with_confidence(confidence)
            .with_effort(Effort::Low),
    )
}

impl Finder for NamingDriftFinder {
    fn name(&self) -> &'static str {
        "naming_drift"
    }

    fn description(&self) -> &'static str {
        "Files whose name does not match the concepts in their content"
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let field = store.signal_field.value()?;
        Ok(field.per_file.values().filter_map(evaluate).collect())
    }
}
