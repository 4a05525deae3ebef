//! Zone of pain: concrete, stable modules
//!
//! Martin's main-sequence view: abstractness A < 0.3 and instability
//! I < 0.3 means many dependents on concrete code that is hard to change.
//! Isolated modules (no instability) and the root module are skipped.

use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::insights::threshold::{compute_confidence, Margin};
use crate::models::{Effort, Evidence, Finding, FindingScope};
use crate::signals::{ModuleSignals, Polarity, Tier};
use crate::store::{FactStore, SlotKind};

const ABSTRACTNESS_THRESHOLD: f64 = 0.3;
const INSTABILITY_THRESHOLD: f64 = 0.3;
const BASE_SEVERITY: f64 = 0.6;

pub struct ZoneOfPainFinder;

fn evaluate(ms: &ModuleSignals) -> Option<Finding> {
    if ms.path == "." || ms.path.is_empty() {
        return None;
    }
    let instability = ms.instability?;
    let a = ms.abstractness;
    if a >= ABSTRACTNESS_THRESHOLD || instability >= INSTABILITY_THRESHOLD {
        return None;
    }

    let distance = (a + instability - 1.0).abs();
    let severity = BASE_SEVERITY + 0.1 * (1.0 - a.max(instability));
    let confidence = compute_confidence(&[
        Margin::new(a, ABSTRACTNESS_THRESHOLD, Polarity::HighIsGood),
        Margin::new(instability, INSTABILITY_THRESHOLD, Polarity::HighIsGood),
    ]);

    Some(
        Finding::new(
            "zone_of_pain",
            severity,
            format!("Zone of Pain: {}/ (A={a:.2}, I={instability:.2})", ms.path),
        )
        .with_files(vec![ms.path.clone()])
        .with_evidence(vec![
            Evidence::new(
                "abstractness",
                a,
                0.0,
                format!("A={a:.2} (< {ABSTRACTNESS_THRESHOLD} = concrete)"),
            ),
            Evidence::new(
                "instability",
                instability,
                0.0,
                format!("I={instability:.2} (< {INSTABILITY_THRESHOLD} = stable)"),
            ),
            Evidence::new(
                "main_seq_distance",
                distance,
                0.0,
                format!("D={distance:.2} (distance from main sequence)"),
            ),
        ])
        .with_suggestion(format!(
            "Module '{}' is concrete and stable, so it is hard to change. Extract interfaces or reduce dependents.",
            ms.path
        ))
        .with_confidence(confidence)
        .with_effort(Effort::High)
        .with_scope(FindingScope::Module),
    )
}

impl Finder for ZoneOfPainFinder {
    fn name(&self) -> &'static str {
        "zone_of_pain"
    }

    fn description(&self) -> &'static str {
        "Concrete modules that many others depend on"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::SignalField, SlotKind::Architecture]
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Bayesian
    }

    fn scope(&self) -> FindingScope {
        FindingScope::Module
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let field = store.signal_field.value()?;
        Ok(field.per_module.values().filter_map(evaluate).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str, a: f64, i: Option<f64>) -> ModuleSignals {
        let mut ms = ModuleSignals::new(path);
        ms.abstractness = a;
        ms.instability = i;
        ms
    }

    #[test]
    fn test_concrete_stable_module() {
        let f = evaluate(&module("core", 0.0, Some(0.1))).unwrap();
        assert!((f.severity - 0.69).abs() < 1e-9);
        assert_eq!(f.files, vec!["core"]);
        assert_eq!(f.scope, FindingScope::Module);
        // (1.0 + 2/3) / 2
        assert!((f.confidence - 5.0 / 6.0).abs() < 1e-9);
        assert!((f.evidence[2].value - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_skips() {
        assert!(evaluate(&module(".", 0.0, Some(0.0))).is_none());
        assert!(evaluate(&module("core", 0.0, None)).is_none());
        assert!(evaluate(&module("core", 0.3, Some(0.1))).is_none());
        assert!(evaluate(&module("core", 0.1, Some(0.3))).is_none());
    }
}
