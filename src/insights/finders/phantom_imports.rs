use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::models::{Effort, Evidence, Finding};
use crate::signals::FileSignals;
use crate::store::FactStore;

use super::by_severity_desc;

const BASE_SEVERITY: f64 = 0.65;
const MAX_SEVERITY: f64 = 0.80;
const MAX_FINDINGS: usize = 10;

/// Imports that resolve to nothing in the codebase.
pub struct PhantomImportsFinder;

fn evaluate(fs: &FileSignals) -> Option<Finding> {
    let n = fs.phantom_import_count;
    if n == 0 {
        return None;
    }
    // 1 → 0.65, 6+ → 0.80
    let severity = MAX_SEVERITY.min(BASE_SEVERITY + 0.03 * (n - 1) as f64);
    let ratio = n as f64 / fs.import_count.max(1) as f64;
    Some(
        Finding::new("phantom_imports", severity, format!("Phantom imports: {} ({n} unresolved)", fs.path))
            .with_files(vec![fs.path.clone()])
            .with_evidence(vec![
                Evidence::new("phantom_import_count", n as f64, 0.0, format!("{n} unresolved import(s)")),
                Evidence::new(
                    "import_count",
                    fs.import_count as f64,
                    0.0,
                    format!("{} total imports", fs.import_count),
                ),
                Evidence::new(
                    "phantom_ratio",
                    ratio,
                    0.0,
                    format!("{:.0}% of imports are phantom", ratio * 100.0),
                ),
            ])
            .with_suggestion("Create missing module or replace with existing library.")
            .with_confidence(1.0)
            .with_effort(Effort::Medium),
    )
}

impl Finder for PhantomImportsFinder {
    fn name(&self) -> &'static str {
        "phantom_imports"
    }

    fn description(&self) -> &'static str {
        "Imports of modules that do not exist"
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let field = store.signal_field.value()?;
        let mut findings: Vec<Finding> = field.per_file.values().filter_map(evaluate).collect();
        findings.sort_by(by_severity_desc);
        findings.truncate(MAX_FINDINGS);
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_phantoms(n: usize, imports: usize) -> FileSignals {
        let mut fs = FileSignals::new("a.py");
        fs.phantom_import_count = n;
        fs.import_count = imports;
        fs
    }

    #[test]
    fn test_severity_scales_with_count() {
        assert!(evaluate(&with_phantoms(0, 3)).is_none());
        assert!((evaluate(&with_phantoms(1, 4)).unwrap().severity - 0.65).abs() < 1e-9);
        assert!((evaluate(&with_phantoms(3, 4)).unwrap().severity - 0.71).abs() < 1e-9);
        assert!((evaluate(&with_phantoms(20, 20)).unwrap().severity - 0.80).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_evidence() {
        let f = evaluate(&with_phantoms(1, 4)).unwrap();
        assert_eq!(f.evidence[2].value, 0.25);
        assert_eq!(f.evidence[2].description, "25% of imports are phantom");
    }
}
