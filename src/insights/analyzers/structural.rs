use tracing::{debug, info};

use crate::config::AnalysisSettings;
use crate::error::ShannonResult;
use crate::graph::{analyze_structure, build_dependency_graph, compute_spectral_summary, StructuralResult};
use crate::insights::base::{Analyzer, ErrorMode};
use crate::store::{EntityId, FactStore, Relation, RelationType, SlotKind};

/// Builds the import graph and runs every structural algorithm over it.
pub struct StructuralAnalyzer {
    settings: AnalysisSettings,
}

impl StructuralAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }
}

impl Analyzer for StructuralAnalyzer {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::FileMetrics, SlotKind::Roles]
    }

    fn provides(&self) -> &'static [SlotKind] {
        &[SlotKind::Structural]
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Fail
    }

    fn analyze(&self, store: &mut FactStore) -> ShannonResult<()> {
        let graph = build_dependency_graph(store.file_metrics.value()?);
        let analysis = analyze_structure(&graph, store.roles.value()?, &self.settings)?;
        info!(
            "Import graph: {} files, {} edges, {} cycles, {} communities",
            graph.node_count(),
            graph.edge_count,
            analysis.cycles.len(),
            analysis.communities.len()
        );

        for (src, dst) in graph.edges() {
            store.add_relation(Relation::new(EntityId::file(src), RelationType::Imports, EntityId::file(dst)));
        }
        store.structural.set(StructuralResult { graph, analysis }, self.name());
        Ok(())
    }
}

/// Laplacian spectrum of the import graph. Leaves the slot empty for
/// graphs too small or too large to decompose.
pub struct SpectralAnalyzer {
    max_nodes: usize,
}

impl SpectralAnalyzer {
    pub fn new(max_nodes: usize) -> Self {
        Self { max_nodes }
    }
}

impl Analyzer for SpectralAnalyzer {
    fn name(&self) -> &'static str {
        "spectral"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::Structural]
    }

    fn provides(&self) -> &'static [SlotKind] {
        &[SlotKind::Spectral]
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Skip
    }

    fn analyze(&self, store: &mut FactStore) -> ShannonResult<()> {
        let summary = compute_spectral_summary(&store.structural.value()?.graph, self.max_nodes);
        match summary {
            Some(s) => store.spectral.set(s, self.name()),
            None => debug!("Spectral analysis skipped"),
        }
        Ok(())
    }
}
