use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::models::{Effort, Evidence, Finding, FindingScope};
use crate::store::{FactStore, SlotKind};

use super::file_name;

/// Below this much history, absence of co-change means nothing.
const MIN_HISTORY_COMMITS: usize = 50;
const SEVERITY: f64 = 0.28;

/// Import edges whose endpoints both change but never together.
pub struct DeadDependencyFinder;

impl Finder for DeadDependencyFinder {
    fn name(&self) -> &'static str {
        "dead_dependency"
    }

    fn description(&self) -> &'static str {
        "Imports between files that evolve independently, possibly vestigial"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::Structural, SlotKind::Cochange, SlotKind::GitHistory]
    }

    fn scope(&self) -> FindingScope {
        FindingScope::FilePair
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let history = store.git_history.value()?;
        let total_commits = history.total_commits();
        if total_commits < MIN_HISTORY_COMMITS {
            return Ok(Vec::new());
        }
        let graph = &store.structural.value()?.graph;
        let cochange = store.cochange.value()?;
        let changes = |f: &str| cochange.file_change_counts.get(f).copied().unwrap_or(0);

        let mut findings = Vec::new();
        for (src, tgt) in graph.edges() {
            let (src_changes, tgt_changes) = (changes(src), changes(tgt));
            if src_changes == 0 || tgt_changes == 0 || cochange.pair(src, tgt).is_some() {
                continue;
            }
            let (src_name, tgt_name) = (file_name(src), file_name(tgt));
            findings.push(
                Finding::new(
                    "dead_dependency",
                    SEVERITY,
                    format!("{src} imports {tgt} but they never change together"),
                )
                .with_files(vec![src.to_string(), tgt.to_string()])
                .with_evidence(vec![
                    Evidence::new(
                        "structural_dep",
                        1.0,
                        0.0,
                        format!("{src_name} has an import statement for {tgt_name}"),
                    ),
                    Evidence::new(
                        "cochange_count",
                        0.0,
                        0.0,
                        format!(
                            "across {total_commits} commits, {src_name} changed {src_changes} times and \
                             {tgt_name} changed {tgt_changes} times, but not together"
                        ),
                    ),
                ])
                .with_suggestion(format!(
                    "The import of {tgt_name} in {src_name} may be unused or vestigial. Check if it can be removed."
                ))
                .with_confidence(0.6)
                .with_effort(Effort::Low)
                .with_scope(FindingScope::FilePair),
            );
        }
        Ok(findings)
    }
}
