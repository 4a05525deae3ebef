use tracing::debug;

use crate::error::ShannonResult;
use crate::graph::detect_clones;
use crate::insights::base::{Analyzer, ErrorMode};
use crate::store::{EntityId, FactStore, Relation, RelationType, SlotKind};

/// Pairwise compression distance over file contents.
pub struct CloneAnalyzer {
    threshold: f64,
}

impl CloneAnalyzer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Analyzer for CloneAnalyzer {
    fn name(&self) -> &'static str {
        "clones"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::FileContents, SlotKind::Roles]
    }

    fn provides(&self) -> &'static [SlotKind] {
        &[SlotKind::ClonePairs]
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Skip
    }

    fn analyze(&self, store: &mut FactStore) -> ShannonResult<()> {
        let pairs = detect_clones(store.file_contents.value()?, store.roles.value()?, self.threshold)?;
        debug!("Found {} clone pairs", pairs.len());

        for p in &pairs {
            store.add_relation(
                Relation::new(EntityId::file(&p.file_a), RelationType::SimilarTo, EntityId::file(&p.file_b))
                    .with_weight(1.0 - p.ncd),
            );
        }
        store.clone_pairs.set(pairs, self.name());
        Ok(())
    }
}
