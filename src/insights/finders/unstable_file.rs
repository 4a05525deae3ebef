use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::models::{Effort, Evidence, Finding};
use crate::signals::{FileSignals, Signal};
use crate::store::FactStore;
use crate::temporal::Trajectory;

use super::by_severity_desc;

const MIN_FILES: usize = 5;
const BASE_SEVERITY: f64 = 0.7;

/// Files that keep changing without settling down.
pub struct UnstableFileFinder;

fn evaluate(fs: &FileSignals, median_changes: usize, span_weeks: i64) -> Option<Finding> {
    if !fs.churn_trajectory.is_volatile() || fs.total_changes <= median_changes {
        return None;
    }
    let pctl = fs.percentile(Signal::TotalChanges).unwrap_or(0.5);
    let severity = BASE_SEVERITY * pctl.max(0.3);

    let rate = if span_weeks > 0 {
        format!("changed {} times over {span_weeks} weeks", fs.total_changes)
    } else {
        format!("changed {} times", fs.total_changes)
    };
    let (trend, suggestion) = if fs.churn_trajectory == Trajectory::Spiking {
        (
            "change rate is increasing, more edits recently",
            "This file is being edited more frequently. Investigate unclear requirements or missing test coverage.",
        )
    } else {
        (
            "change rate is volatile with no sign of settling down",
            "This file has been modified repeatedly without stabilizing. Consider splitting it or adding tests to reduce churn.",
        )
    };

    Some(
        Finding::new("unstable_file", severity, format!("Unstable file: {}", fs.path))
            .with_files(vec![fs.path.clone()])
            .with_evidence(vec![
                Evidence::new("total_changes", fs.total_changes as f64, pctl, rate),
                Evidence::new("churn_trajectory", fs.churn_slope, 0.0, trend),
            ])
            .with_suggestion(suggestion)
            .with_confidence(0.75)
            .with_effort(Effort::Medium),
    )
}

impl Finder for UnstableFileFinder {
    fn name(&self) -> &'static str {
        "unstable_file"
    }

    fn description(&self) -> &'static str {
        "Files with churning or spiking change history"
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let field = store.signal_field.value()?;
        if field.file_count() < MIN_FILES {
            return Ok(Vec::new());
        }
        let mut changes: Vec<usize> = field.per_file.values().map(|f| f.total_changes).collect();
        changes.sort_unstable();
        let median = changes[changes.len() / 2];
        let span_weeks = store.git_history.get().map_or(0, |h| (h.span_days / 7).max(1));

        let mut findings: Vec<Finding> = field
            .per_file
            .values()
            .filter_map(|fs| evaluate(fs, median, span_weeks))
            .collect();
        findings.sort_by(by_severity_desc);
        Ok(findings)
    }
}
