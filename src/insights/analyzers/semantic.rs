use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ShannonResult;
use crate::insights::base::Analyzer;
use crate::semantics::{analyze_semantics, classify_path, classify_role, Role};
use crate::store::{FactStore, SlotKind};

/// Role classification and per-file concept analysis.
///
/// Files without a syntax record get a path-only role so later stages
/// still see every scanned file.
pub struct SemanticAnalyzer;

impl Analyzer for SemanticAnalyzer {
    fn name(&self) -> &'static str {
        "semantics"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::FileSyntax]
    }

    fn provides(&self) -> &'static [SlotKind] {
        &[SlotKind::Semantics, SlotKind::Roles]
    }

    fn analyze(&self, store: &mut FactStore) -> ShannonResult<()> {
        let syntax = store.file_syntax.value()?;
        let empty = BTreeMap::new();
        let contents = store.file_contents.get().unwrap_or(&empty);

        let mut roles: BTreeMap<String, Role> = syntax.iter().map(|(p, s)| (p.clone(), classify_role(s))).collect();
        for path in store.files() {
            roles.entry(path.to_string()).or_insert_with(|| classify_path(path));
        }
        let semantics = analyze_semantics(syntax, contents);

        debug!("Classified {} files, {} with semantics", roles.len(), semantics.len());
        store.roles.set(roles, self.name());
        store.semantics.set(semantics, self.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileMetrics, FileSyntax};

    #[test]
    fn test_every_scanned_file_gets_a_role() {
        let mut store = FactStore::new(".");
        let metrics = ["src/app.py", "tests/test_app.py"]
            .iter()
            .map(|p| FileMetrics {
                path: p.to_string(),
                ..Default::default()
            })
            .collect();
        let syntax = BTreeMap::from([(
            "src/app.py".to_string(),
            FileSyntax {
                path: "src/app.py".into(),
                ..Default::default()
            },
        )]);
        store.ingest_scan(metrics, syntax, BTreeMap::new());

        SemanticAnalyzer.analyze(&mut store).unwrap();
        let roles = store.roles.value().unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles["tests/test_app.py"], Role::Test);
        assert_eq!(store.semantics.value().unwrap().len(), 1);
        assert_eq!(store.roles.producer(), Some("semantics"));
    }
}
