use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::insights::threshold::{compute_confidence, Margin};
use crate::models::{Effort, Evidence, Finding};
use crate::signals::{FileSignals, Polarity};
use crate::store::FactStore;

const STUB_THRESHOLD: f64 = 0.5;
const GINI_THRESHOLD: f64 = 0.6;
const BASE_SEVERITY: f64 = 0.71;

/// Mostly stubs, with the real work piled into a few functions.
pub struct HollowCodeFinder;

fn evaluate(fs: &FileSignals) -> Option<Finding> {
    if fs.function_count == 0 || fs.stub_ratio <= STUB_THRESHOLD || fs.impl_gini <= GINI_THRESHOLD {
        return None;
    }
    let confidence = compute_confidence(&[
        Margin::new(fs.stub_ratio, STUB_THRESHOLD, Polarity::HighIsBad),
        Margin::new(fs.impl_gini, GINI_THRESHOLD, Polarity::HighIsBad),
    ]);
    let stub_pct = fs.stub_ratio * 100.0;
    Some(
        Finding::new("hollow_code", BASE_SEVERITY, format!("Hollow code: {} ({stub_pct:.0}% stubs)", fs.path))
            .with_files(vec![fs.path.clone()])
            .with_evidence(vec![
                Evidence::new("stub_ratio", fs.stub_ratio, 0.0, format!("{stub_pct:.0}% of functions are stubs")),
                Evidence::new(
                    "impl_gini",
                    fs.impl_gini,
                    0.0,
                    format!("Gini={:.2} (very uneven implementation)", fs.impl_gini),
                ),
                Evidence::new(
                    "function_count",
                    fs.function_count as f64,
                    0.0,
                    format!("{} functions total", fs.function_count),
                ),
            ])
            .with_suggestion("Implement the stub functions. Priority: functions called by other files.")
            .with_confidence(confidence)
            .with_effort(Effort::Medium),
    )
}

impl Finder for HollowCodeFinder {
    fn name(&self) -> &'static str {
        "hollow_code"
    }

    fn description(&self) -> &'static str {
        "Files whose functions are mostly unimplemented stubs"
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let field = store.signal_field.value()?;
        Ok(field.per_file.values().filter_map(evaluate).collect())
    }
}
