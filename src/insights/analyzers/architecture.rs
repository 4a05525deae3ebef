use tracing::info;

use crate::architecture::analyze_architecture;
use crate::error::ShannonResult;
use crate::insights::base::Analyzer;
use crate::store::{EntityId, FactStore, Relation, RelationType, SlotKind};

/// Module metrics, layering and layer violations.
pub struct ArchitectureAnalyzer;

impl Analyzer for ArchitectureAnalyzer {
    fn name(&self) -> &'static str {
        "architecture"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::Structural, SlotKind::Roles, SlotKind::FileSyntax]
    }

    fn provides(&self) -> &'static [SlotKind] {
        &[SlotKind::Architecture]
    }

    fn analyze(&self, store: &mut FactStore) -> ShannonResult<()> {
        let structural = store.structural.value()?;
        let arch = analyze_architecture(
            &structural.graph,
            store.roles.value()?,
            store.file_syntax.value()?,
            &structural.analysis.node_community,
        );
        info!(
            "Architecture: {} modules, {} layers, {} violations",
            arch.module_count(),
            arch.layers.len(),
            arch.violations.len()
        );

        for (src, targets) in &arch.module_graph {
            for (dst, edges) in targets {
                store.add_relation(
                    Relation::new(EntityId::module(src), RelationType::DependsOn, EntityId::module(dst))
                        .with_weight(*edges as f64),
                );
            }
        }
        store.architecture.set(arch, self.name());
        Ok(())
    }
}
