//! Layer violations: a module importing a module above it
//!
//! Layers come from the module DAG (see `architecture::layers`); any edge
//! whose source sits in a lower layer than its target is reported once per
//! module pair. The root module is not a meaningful layer and is skipped.

use crate::architecture::Violation;
use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::models::{Effort, Evidence, Finding, FindingScope};
use crate::signals::Tier;
use crate::store::{FactStore, SlotKind};

const BASE_SEVERITY: f64 = 0.52;

pub struct LayerViolationFinder;

fn is_root(module: &str) -> bool {
    module == "." || module.is_empty()
}

fn evaluate(v: &Violation) -> Option<Finding> {
    if is_root(&v.source_module) || is_root(&v.target_module) {
        return None;
    }
    let (src, tgt) = (&v.source_module, &v.target_module);
    Some(
        Finding::new(
            "layer_violation",
            BASE_SEVERITY,
            format!("Layer violation: {src}/ imports {tgt}/ (L{}→L{})", v.source_layer, v.target_layer),
        )
        .with_files(vec![src.clone(), tgt.clone()])
        .with_evidence(vec![
            Evidence::new("source_layer", v.source_layer as f64, 0.0, format!("{src} at layer {}", v.source_layer)),
            Evidence::new("target_layer", v.target_layer as f64, 0.0, format!("{tgt} at layer {}", v.target_layer)),
            Evidence::new(
                "edge_count",
                v.edge_count as f64,
                0.0,
                format!("{} file import(s) cross the boundary", v.edge_count),
            ),
        ])
        .with_suggestion(format!(
            "'{src}' at layer {} imports '{tgt}' at layer {}. Inject the dependency or move the shared code down.",
            v.source_layer, v.target_layer
        ))
        .with_effort(Effort::Medium)
        .with_scope(FindingScope::ModulePair),
    )
}

impl Finder for LayerViolationFinder {
    fn name(&self) -> &'static str {
        "layer_violation"
    }

    fn description(&self) -> &'static str {
        "Modules that depend on modules in a higher layer"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::SignalField, SlotKind::Architecture]
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Bayesian
    }

    fn scope(&self) -> FindingScope {
        FindingScope::ModulePair
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let arch = store.architecture.value()?;
        Ok(arch.violations.iter().filter_map(evaluate).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::Architecture;

    fn violation(src: &str, tgt: &str) -> Violation {
        Violation {
            source_module: src.into(),
            target_module: tgt.into(),
            source_layer: 0,
            target_layer: 2,
            edge_count: 3,
        }
    }

    #[test]
    fn test_reports_module_pair() {
        let f = evaluate(&violation("db", "api")).unwrap();
        assert_eq!(f.files, vec!["db", "api"]);
        assert_eq!(f.scope, FindingScope::ModulePair);
        assert_eq!(f.confidence, 1.0);
        assert!(f.title.contains("L0→L2"));
        assert_eq!(f.evidence[2].value, 3.0);
    }

    #[test]
    fn test_root_module_skipped() {
        assert!(evaluate(&violation(".", "api")).is_none());
        assert!(evaluate(&violation("db", "")).is_none());
    }

    #[test]
    fn test_find_reads_architecture() {
        let mut store = FactStore::new(".");
        store.architecture.set(
            Architecture {
                violations: vec![violation("db", "api"), violation(".", "api")],
                ..Default::default()
            },
            "test",
        );
        assert_eq!(LayerViolationFinder.find(&store).unwrap().len(), 1);
    }
}
