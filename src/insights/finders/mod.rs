//! Built-in finders
//!
//! Each finder reads the fused `SignalField` (and occasionally raw slots)
//! and turns threshold crossings into findings with evidence.
//!
//! | finder           | scope     | tier     | hotspot |
//! |------------------|-----------|----------|---------|
//! | high_risk_hub    | FILE      | BAYESIAN | yes     |
//! | god_file         | FILE      | BAYESIAN | yes     |
//! | weak_link        | FILE      | BAYESIAN | yes     |
//! | orphan_code      | FILE      | ABSOLUTE | no      |
//! | hidden_coupling  | FILE_PAIR | ABSOLUTE | no      |
//! | dead_dependency  | FILE_PAIR | ABSOLUTE | no      |
//! | copy_paste_clone | FILE_PAIR | ABSOLUTE | no      |
//! | unstable_file    | FILE      | ABSOLUTE | yes     |
//! | knowledge_silo   | FILE      | BAYESIAN | yes     |
//! | phantom_imports  | FILE      | ABSOLUTE | no      |
//! | hollow_code      | FILE      | ABSOLUTE | no      |
//! | zone_of_pain     | MODULE    | BAYESIAN | no      |
//! | naming_drift     | FILE      | ABSOLUTE | no      |
//! | boundary_mismatch| MODULE    | ABSOLUTE | no      |
//! | layer_violation  | MODULE_PAIR | BAYESIAN | no    |
//! | conway_violation | MODULE_PAIR | BAYESIAN | no    |
//! | flat_architecture| CODEBASE  | ABSOLUTE | no      |

mod boundary_mismatch;
mod conway_violation;
mod copy_paste_clone;
mod dead_dependency;
mod flat_architecture;
mod god_file;
mod hidden_coupling;
mod high_risk_hub;
mod hollow_code;
mod knowledge_silo;
mod layer_violation;
mod naming_drift;
mod orphan_code;
mod phantom_imports;
mod unstable_file;
mod weak_link;
mod zone_of_pain;

pub use boundary_mismatch::BoundaryMismatchFinder;
pub use conway_violation::ConwayViolationFinder;
pub use copy_paste_clone::CopyPasteCloneFinder;
pub use dead_dependency::DeadDependencyFinder;
pub use flat_architecture::FlatArchitectureFinder;
pub use god_file::GodFileFinder;
pub use hidden_coupling::HiddenCouplingFinder;
pub use high_risk_hub::HighRiskHubFinder;
pub use hollow_code::HollowCodeFinder;
pub use knowledge_silo::KnowledgeSiloFinder;
pub use layer_violation::LayerViolationFinder;
pub use naming_drift::NamingDriftFinder;
pub use orphan_code::OrphanCodeFinder;
pub use phantom_imports::PhantomImportsFinder;
pub use unstable_file::UnstableFileFinder;
pub use weak_link::WeakLinkFinder;
pub use zone_of_pain::ZoneOfPainFinder;

use std::cmp::Ordering;
use std::path::Path;

use super::base::Finder;
use crate::models::Finding;

/// Every built-in finder, in reporting order.
pub fn builtin_finders() -> Vec<Box<dyn Finder>> {
    vec![
        Box::new(HighRiskHubFinder),
        Box::new(GodFileFinder),
        Box::new(WeakLinkFinder),
        Box::new(OrphanCodeFinder),
        Box::new(HiddenCouplingFinder),
        Box::new(DeadDependencyFinder),
        Box::new(CopyPasteCloneFinder),
        Box::new(UnstableFileFinder),
        Box::new(KnowledgeSiloFinder),
        Box::new(PhantomImportsFinder),
        Box::new(HollowCodeFinder),
        Box::new(ZoneOfPainFinder),
        Box::new(NamingDriftFinder),
        Box::new(BoundaryMismatchFinder),
        Box::new(LayerViolationFinder),
        Box::new(ConwayViolationFinder),
        Box::new(FlatArchitectureFinder),
    ]
}

/// Final path component, for human-readable descriptions.
pub(crate) fn file_name(path: &str) -> &str {
    Path::new(path).file_name().and_then(|n| n.to_str()).unwrap_or(path)
}

pub(crate) fn by_severity_desc(a: &Finding, b: &Finding) -> Ordering {
    b.severity.partial_cmp(&a.severity).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::signals::{FileSignals, SignalField, Tier};
    use crate::store::FactStore;

    pub fn field(tier: Tier, files: Vec<FileSignals>) -> SignalField {
        SignalField {
            tier,
            per_file: files.into_iter().map(|f| (f.path.clone(), f)).collect(),
            ..Default::default()
        }
    }

    pub fn store(field: SignalField) -> FactStore {
        let mut store = FactStore::new(".");
        store.signal_field.set(field, "test");
        store
    }

    /// `n` unremarkable files `f0.py..`.
    pub fn filler(n: usize) -> Vec<FileSignals> {
        (0..n).map(|i| FileSignals::new(format!("f{i}.py"))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_builtin_names_unique() {
        let finders = builtin_finders();
        let names: BTreeSet<_> = finders.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), 17);
        assert!(finders.iter().all(|f| !f.description().is_empty()));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("src/app/models.py"), "models.py");
        assert_eq!(file_name("models.py"), "models.py");
    }
}
