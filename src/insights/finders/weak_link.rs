//! Weak link: a file much riskier than its import neighborhood
//!
//! Uses the health Laplacian `delta_h` with an absolute threshold; the
//! value is already relative to the neighbors, so no percentile is needed.

use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::insights::threshold::{compute_confidence, compute_hotspot_median, is_hotspot, Margin};
use crate::models::{Effort, Evidence, Finding};
use crate::signals::{FileSignals, Polarity, Signal, Tier};
use crate::store::FactStore;

use super::by_severity_desc;

const DELTA_H_THRESHOLD: f64 = 0.4;
const BASE_SEVERITY: f64 = 0.75;
const MAX_SEVERITY: f64 = 0.85;

pub struct WeakLinkFinder;

fn evaluate(fs: &FileSignals, delta_h: f64) -> Option<Finding> {
    if delta_h <= DELTA_H_THRESHOLD || fs.is_orphan {
        return None;
    }
    // 0.4 → 0.75, 0.8 → 0.85
    let severity = MAX_SEVERITY.min(BASE_SEVERITY + (delta_h - DELTA_H_THRESHOLD) * 0.25);
    let confidence = compute_confidence(&[Margin::new(delta_h, DELTA_H_THRESHOLD, Polarity::HighIsBad)]);

    Some(
        Finding::new("weak_link", severity, format!("Weak link: {} (Δh = {delta_h:.2})", fs.path))
            .with_files(vec![fs.path.clone()])
            .with_evidence(vec![
                Evidence::new("delta_h", delta_h, 0.0, format!("Δh = {delta_h:.2} (much worse than neighbors)")),
                Evidence::new("raw_risk", fs.raw_risk, 0.0, format!("Raw risk = {:.2}", fs.raw_risk)),
                Evidence::new(
                    "risk_score",
                    fs.risk_score,
                    fs.percentile(Signal::RiskScore).unwrap_or(0.0),
                    format!("Risk score = {:.2}", fs.risk_score),
                ),
            ])
            .with_suggestion("This file drags down its healthy neighborhood. Prioritize improvement.")
            .with_confidence(confidence)
            .with_effort(Effort::Medium),
    )
}

impl Finder for WeakLinkFinder {
    fn name(&self) -> &'static str {
        "weak_link"
    }

    fn description(&self) -> &'static str {
        "Files much riskier than the files around them"
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Bayesian
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let field = store.signal_field.value()?;
        if field.tier == Tier::Absolute {
            return Ok(Vec::new());
        }
        let median = compute_hotspot_median(field);
        let mut findings: Vec<Finding> = field
            .per_file
            .values()
            .filter(|fs| is_hotspot(fs, median))
            .filter_map(|fs| evaluate(fs, field.delta_h(&fs.path)))
            .collect();
        findings.sort_by(by_severity_desc);
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::finders::testutil;

    #[test]
    fn test_severity_ramp() {
        let fs = FileSignals::new("a.py");
        let low = evaluate(&fs, 0.5).unwrap();
        assert!((low.severity - 0.775).abs() < 1e-9);
        let high = evaluate(&fs, 1.5).unwrap();
        assert_eq!(high.severity, 0.85);
        assert!(evaluate(&fs, 0.4).is_none());
    }

    #[test]
    fn test_orphans_skipped() {
        let mut fs = FileSignals::new("a.py");
        fs.is_orphan = true;
        assert!(evaluate(&fs, 0.9).is_none());
    }

    #[test]
    fn test_only_hotspots_reported() {
        let mut files = testutil::filler(4);
        for (i, f) in files.iter_mut().enumerate() {
            f.total_changes = i + 1;
        }
        let mut field = testutil::field(Tier::Bayesian, files);
        // median of [1, 2, 3, 4] is 2
        field.delta_h.insert("f0.py".into(), 0.9);
        field.delta_h.insert("f3.py".into(), 0.9);
        let store = testutil::store(field);

        let findings = WeakLinkFinder.find(&store).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].files, vec!["f3.py"]);
        assert!((findings[0].confidence - 0.5 / 0.6).abs() < 1e-9);
    }
}
