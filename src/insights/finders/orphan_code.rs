use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::models::{Effort, Evidence, Finding};
use crate::signals::FileSignals;
use crate::store::FactStore;

const BASE_SEVERITY: f64 = 0.55;
const MAX_FINDINGS: usize = 10;

/// Files nothing imports that are neither entry points nor tests.
pub struct OrphanCodeFinder;

fn evaluate(fs: &FileSignals) -> Option<Finding> {
    // package markers are imported implicitly
    if !fs.is_orphan || fs.path.ends_with("__init__.py") {
        return None;
    }
    let mut evidence = vec![
        Evidence::new("in_degree", fs.in_degree as f64, 0.0, "No files import this"),
        Evidence::new("role", 0.0, 0.0, format!("Classified as {}", fs.role)),
    ];
    if fs.depth == -1 {
        evidence.push(Evidence::new("depth", -1.0, 0.0, "Unreachable from entry points"));
    }
    Some(
        Finding::new("orphan_code", BASE_SEVERITY, format!("Orphan file: {}", fs.path))
            .with_files(vec![fs.path.clone()])
            .with_evidence(evidence)
            .with_suggestion("Wire into dependency graph or remove if unused.")
            .with_confidence(1.0)
            .with_effort(Effort::Low),
    )
}

impl Finder for OrphanCodeFinder {
    fn name(&self) -> &'static str {
        "orphan_code"
    }

    fn description(&self) -> &'static str {
        "Files no other file imports"
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let field = store.signal_field.value()?;
        Ok(field.per_file.values().filter_map(evaluate).take(MAX_FINDINGS).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::finders::testutil;
    use crate::signals::Tier;

    #[test]
    fn test_orphans_capped_in_path_order() {
        let mut files = testutil::filler(15);
        for f in &mut files {
            f.is_orphan = true;
        }
        let mut init = FileSignals::new("pkg/__init__.py");
        init.is_orphan = true;
        files.push(init);

        let store = testutil::store(testutil::field(Tier::Absolute, files));
        let findings = OrphanCodeFinder.find(&store).unwrap();
        assert_eq!(findings.len(), 10);
        assert_eq!(findings[0].files, vec!["f0.py"]);
        assert!(findings.iter().all(|f| f.severity == 0.55 && f.effort == Effort::Low));
        assert_eq!(findings[0].evidence.len(), 3);
    }

    #[test]
    fn test_init_files_skipped() {
        let mut fs = FileSignals::new("pkg/__init__.py");
        fs.is_orphan = true;
        assert!(evaluate(&fs).is_none());
    }
}
