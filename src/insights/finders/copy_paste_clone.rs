use crate::error::ShannonResult;
use crate::graph::ClonePair;
use crate::insights::base::Finder;
use crate::insights::threshold::{compute_confidence, Margin};
use crate::models::{Effort, Evidence, Finding, FindingScope};
use crate::signals::Polarity;
use crate::store::{FactStore, SlotKind};

use super::by_severity_desc;

const NCD_THRESHOLD: f64 = 0.3;
const BASE_SEVERITY: f64 = 0.50;

/// File pairs whose contents compress together almost as well as either
/// alone.
pub struct CopyPasteCloneFinder;

fn evaluate(pair: &ClonePair) -> Option<Finding> {
    let ncd = pair.ncd;
    if ncd >= NCD_THRESHOLD {
        return None;
    }
    // identical → 0.60, barely a clone → 0.50
    let severity = BASE_SEVERITY + (NCD_THRESHOLD - ncd) * 0.33;
    let confidence = compute_confidence(&[Margin::new(ncd, NCD_THRESHOLD, Polarity::HighIsGood)]);

    let mut files = vec![pair.file_a.clone(), pair.file_b.clone()];
    files.sort();
    Some(
        Finding::new(
            "copy_paste_clone",
            severity,
            format!("Copy-paste clone: {} <-> {}", files[0], files[1]),
        )
        .with_files(files)
        .with_evidence(vec![Evidence::new(
            "ncd_score",
            ncd,
            0.0,
            format!("NCD={ncd:.2} (< {NCD_THRESHOLD} = clone)"),
        )])
        .with_suggestion("Extract shared logic into a common module.")
        .with_confidence(confidence)
        .with_effort(Effort::Medium)
        .with_scope(FindingScope::FilePair),
    )
}

impl Finder for CopyPasteCloneFinder {
    fn name(&self) -> &'static str {
        "copy_paste_clone"
    }

    fn description(&self) -> &'static str {
        "Near-duplicate files found by compression distance"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::ClonePairs]
    }

    fn scope(&self) -> FindingScope {
        FindingScope::FilePair
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let mut findings: Vec<Finding> = store.clone_pairs.value()?.iter().filter_map(evaluate).collect();
        findings.sort_by(by_severity_desc);
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str, ncd: f64) -> ClonePair {
        ClonePair {
            file_a: a.into(),
            file_b: b.into(),
            ncd,
            size_a: 2000,
            size_b: 2000,
        }
    }

    #[test]
    fn test_clone_findings_sorted_by_similarity() {
        let mut store = FactStore::new(".");
        store.clone_pairs.set(
            vec![pair("z.py", "a.py", 0.25), pair("b.py", "c.py", 0.0), pair("d.py", "e.py", 0.35)],
            "test",
        );
        let findings = CopyPasteCloneFinder.find(&store).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].files, vec!["b.py", "c.py"]);
        assert!((findings[0].severity - 0.599).abs() < 1e-9);
        assert_eq!(findings[0].confidence, 1.0);
        assert_eq!(findings[1].files, vec!["a.py", "z.py"]);
        assert_eq!(findings[1].scope, FindingScope::FilePair);
    }

    #[test]
    fn test_missing_slot_is_an_error() {
        assert!(CopyPasteCloneFinder.find(&FactStore::new(".")).is_err());
    }
}
