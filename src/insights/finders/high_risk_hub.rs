//! High-risk hub: a central file that is also complex or churning
//!
//! - centrality: pagerank or blast radius percentile ≥ 0.90
//! - and: cognitive load percentile ≥ 0.90, or a CHURNING/SPIKING trajectory
//!
//! Severity scales with the mean of the percentiles that fired.

use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::models::{Effort, Evidence, Finding};
use crate::signals::{FileSignals, Signal, Tier};
use crate::store::FactStore;

use super::by_severity_desc;

const MIN_FILES: usize = 5;
const PCTL_THRESHOLD: f64 = 0.90;
const BASE_SEVERITY: f64 = 1.0;

pub struct HighRiskHubFinder;

fn suggestion(complex: bool, churning: bool) -> &'static str {
    match (complex, churning) {
        (true, true) => {
            "This file is central, complex, and frequently modified. \
             Split into smaller modules to reduce coupling and simplify changes."
        }
        (true, false) => {
            "This file is central and complex. \
             Break into smaller pieces to make changes safer and reviews easier."
        }
        _ => {
            "This file is central and churning. \
             Consider stabilizing the interface or extracting frequently-changing parts."
        }
    }
}

fn evaluate(fs: &FileSignals, total_files: usize) -> Option<Finding> {
    let pr = fs.percentile(Signal::Pagerank).unwrap_or(0.0);
    let br = fs.percentile(Signal::BlastRadiusSize).unwrap_or(0.0);
    let cog = fs.percentile(Signal::CognitiveLoad).unwrap_or(0.0);

    if pr < PCTL_THRESHOLD && br < PCTL_THRESHOLD {
        return None;
    }
    let complex = cog >= PCTL_THRESHOLD;
    let churning = fs.churn_trajectory.is_volatile();
    if !complex && !churning {
        return None;
    }

    let mut evidence = Vec::new();
    let mut pcts = Vec::new();
    if pr >= PCTL_THRESHOLD {
        pcts.push(pr);
        evidence.push(Evidence::new(
            "pagerank",
            fs.pagerank,
            pr,
            format!("{} files import this directly", fs.in_degree),
        ));
    }
    if br >= PCTL_THRESHOLD {
        pcts.push(br);
        evidence.push(Evidence::new(
            "blast_radius_size",
            fs.blast_radius_size as f64,
            br,
            format!("a bug here could affect {} of {} files", fs.blast_radius_size, total_files),
        ));
    }
    if complex {
        pcts.push(cog);
        evidence.push(Evidence::new(
            "cognitive_load",
            fs.cognitive_load,
            cog,
            format!("harder to understand than {:.0}% of files", cog * 100.0),
        ));
    }
    if churning {
        evidence.push(Evidence::new(
            "churn_trajectory",
            0.0,
            0.0,
            format!("trajectory={}, {} changes", fs.churn_trajectory, fs.total_changes),
        ));
    }

    let avg = pcts.iter().sum::<f64>() / pcts.len() as f64;
    Some(
        Finding::new("high_risk_hub", BASE_SEVERITY * avg.max(0.5), format!("High-risk hub: {}", fs.path))
            .with_files(vec![fs.path.clone()])
            .with_evidence(evidence)
            .with_suggestion(suggestion(complex, churning))
            .with_confidence(0.9)
            .with_effort(Effort::Medium),
    )
}

impl Finder for HighRiskHubFinder {
    fn name(&self) -> &'static str {
        "high_risk_hub"
    }

    fn description(&self) -> &'static str {
        "Central files that are complex or churning; a bug here spreads far"
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Bayesian
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let field = store.signal_field.value()?;
        if field.file_count() < MIN_FILES || field.tier == Tier::Absolute {
            return Ok(Vec::new());
        }
        let mut findings: Vec<Finding> = field
            .per_file
            .values()
            .filter_map(|fs| evaluate(fs, field.file_count()))
            .collect();
        findings.sort_by(by_severity_desc);
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::finders::testutil;
    use crate::temporal::Trajectory;

    fn hub() -> FileSignals {
        let mut fs = FileSignals::new("core.py");
        fs.in_degree = 12;
        fs.percentiles.insert(Signal::Pagerank, 0.96);
        fs.percentiles.insert(Signal::CognitiveLoad, 0.92);
        fs
    }

    #[test]
    fn test_central_and_complex() {
        let mut files = testutil::filler(10);
        files.push(hub());
        let store = testutil::store(testutil::field(Tier::Bayesian, files));
        let findings = HighRiskHubFinder.find(&store).unwrap();
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.files, vec!["core.py"]);
        assert!((f.severity - 0.94).abs() < 1e-9);
        assert_eq!(f.evidence.len(), 2);
        assert_eq!(f.confidence, 0.9);
    }

    #[test]
    fn test_central_and_churning() {
        let mut fs = hub();
        fs.percentiles.insert(Signal::CognitiveLoad, 0.2);
        fs.churn_trajectory = Trajectory::Spiking;
        let f = evaluate(&fs, 20).unwrap();
        assert!((f.severity - 0.96).abs() < 1e-9);
        assert!(f.suggestion.contains("churning"));
    }

    #[test]
    fn test_not_central() {
        let mut fs = hub();
        fs.percentiles.insert(Signal::Pagerank, 0.89);
        assert!(evaluate(&fs, 20).is_none());
    }

    #[test]
    fn test_absolute_tier_and_small_codebases_skip() {
        let store = testutil::store(testutil::field(Tier::Absolute, vec![hub()]));
        assert!(HighRiskHubFinder.find(&store).unwrap().is_empty());
    }
}
