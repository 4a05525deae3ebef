use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::registry::Signal;
use crate::semantics::Role;
use crate::temporal::Trajectory;

/// Normalization tier, chosen by file count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// Too few files for percentiles; finders use absolute thresholds.
    #[default]
    Absolute,
    /// Percentiles smoothed toward the middle.
    Bayesian,
    Full,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Absolute => "ABSOLUTE",
            Tier::Bayesian => "BAYESIAN",
            Tier::Full => "FULL",
        }
    }

    pub fn for_file_count(n: usize, absolute_max: usize, full_min: usize) -> Self {
        if n < absolute_max {
            Tier::Absolute
        } else if n < full_min {
            Tier::Bayesian
        } else {
            Tier::Full
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PER-FILE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSignals {
    pub path: String,

    // scanning
    pub lines: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub max_nesting: usize,
    pub impl_gini: f64,
    pub stub_ratio: f64,
    pub import_count: usize,

    // semantics
    pub role: Role,
    pub concept_count: usize,
    pub concept_entropy: f64,
    pub naming_drift: f64,
    pub todo_density: f64,
    pub docstring_coverage: Option<f64>,
    pub semantic_coherence: f64,

    // graph
    pub pagerank: f64,
    pub betweenness: f64,
    pub in_degree: usize,
    pub out_degree: usize,
    pub blast_radius_size: usize,
    pub depth: i64,
    pub is_orphan: bool,
    pub phantom_import_count: usize,
    /// -1 without a community assignment
    pub community: i64,
    pub compression_ratio: f64,
    pub cognitive_load: f64,

    // temporal
    pub total_changes: usize,
    pub churn_trajectory: Trajectory,
    pub churn_slope: f64,
    pub churn_cv: f64,
    pub bus_factor: f64,
    pub author_entropy: f64,
    pub fix_ratio: f64,
    pub refactor_ratio: f64,
    pub change_entropy: f64,

    // hierarchy
    pub parent_dir: String,
    pub module_path: String,
    pub dir_depth: usize,
    pub siblings_count: usize,

    // fusion
    pub raw_risk: f64,
    pub risk_score: f64,
    pub wiring_quality: f64,
    pub file_health_score: f64,

    pub percentiles: BTreeMap<Signal, f64>,
}

impl FileSignals {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lines: 0,
            function_count: 0,
            class_count: 0,
            max_nesting: 0,
            impl_gini: 0.0,
            stub_ratio: 0.0,
            import_count: 0,
            role: Role::Unknown,
            concept_count: 0,
            concept_entropy: 0.0,
            naming_drift: 0.0,
            todo_density: 0.0,
            docstring_coverage: None,
            semantic_coherence: 0.0,
            pagerank: 0.0,
            betweenness: 0.0,
            in_degree: 0,
            out_degree: 0,
            blast_radius_size: 0,
            depth: -1,
            is_orphan: false,
            phantom_import_count: 0,
            community: -1,
            compression_ratio: 0.0,
            cognitive_load: 0.0,
            total_changes: 0,
            churn_trajectory: Trajectory::Dormant,
            churn_slope: 0.0,
            churn_cv: 0.0,
            bus_factor: 1.0,
            author_entropy: 0.0,
            fix_ratio: 0.0,
            refactor_ratio: 0.0,
            change_entropy: 0.0,
            parent_dir: ".".to_string(),
            module_path: ".".to_string(),
            dir_depth: 0,
            siblings_count: 0,
            raw_risk: 0.0,
            risk_score: 0.0,
            wiring_quality: 1.0,
            file_health_score: 1.0,
            percentiles: BTreeMap::new(),
        }
    }

    /// Numeric value of a per-file signal. `None` for non-file signals,
    /// text signals and unset nullable values.
    pub fn numeric(&self, signal: Signal) -> Option<f64> {
        use Signal as S;
        let v = match signal {
            S::Lines => self.lines as f64,
            S::FunctionCount => self.function_count as f64,
            S::ClassCount => self.class_count as f64,
            S::MaxNesting => self.max_nesting as f64,
            S::ImplGini => self.impl_gini,
            S::StubRatio => self.stub_ratio,
            S::ImportCount => self.import_count as f64,
            S::ConceptCount => self.concept_count as f64,
            S::ConceptEntropy => self.concept_entropy,
            S::NamingDrift => self.naming_drift,
            S::TodoDensity => self.todo_density,
            S::DocstringCoverage => return self.docstring_coverage,
            S::SemanticCoherence => self.semantic_coherence,
            S::Pagerank => self.pagerank,
            S::Betweenness => self.betweenness,
            S::InDegree => self.in_degree as f64,
            S::OutDegree => self.out_degree as f64,
            S::BlastRadiusSize => self.blast_radius_size as f64,
            S::Depth => self.depth as f64,
            S::IsOrphan => f64::from(u8::from(self.is_orphan)),
            S::PhantomImportCount => self.phantom_import_count as f64,
            S::Community => self.community as f64,
            S::CompressionRatio => self.compression_ratio,
            S::CognitiveLoad => self.cognitive_load,
            S::TotalChanges => self.total_changes as f64,
            S::ChurnSlope => self.churn_slope,
            S::ChurnCv => self.churn_cv,
            S::BusFactor => self.bus_factor,
            S::AuthorEntropy => self.author_entropy,
            S::FixRatio => self.fix_ratio,
            S::RefactorRatio => self.refactor_ratio,
            S::ChangeEntropy => self.change_entropy,
            S::RawRisk => self.raw_risk,
            S::RiskScore => self.risk_score,
            S::WiringQuality => self.wiring_quality,
            S::FileHealthScore => self.file_health_score,
            _ => return None,
        };
        Some(v)
    }

    pub fn percentile(&self, signal: Signal) -> Option<f64> {
        self.percentiles.get(&signal).copied()
    }

    /// Every numeric per-file signal by name, for snapshots.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        Signal::ALL
            .iter()
            .filter_map(|s| self.numeric(*s).map(|v| (s.as_str().to_string(), v)))
            .collect()
    }
}

// ============================================================================
// PER-MODULE / PER-DIRECTORY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModuleSignals {
    pub path: String,
    pub cohesion: f64,
    pub coupling: f64,
    pub instability: Option<f64>,
    pub abstractness: f64,
    pub main_seq_distance: f64,
    pub boundary_alignment: f64,
    pub layer_violation_count: usize,
    pub role_consistency: f64,
    pub velocity: f64,
    pub coordination_cost: f64,
    pub knowledge_gini: f64,
    pub module_bus_factor: f64,
    pub mean_cognitive_load: f64,
    pub file_count: usize,
    pub health_score: f64,
    pub percentiles: BTreeMap<Signal, f64>,
}

impl ModuleSignals {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            module_bus_factor: 1.0,
            ..Default::default()
        }
    }

    pub fn numeric(&self, signal: Signal) -> Option<f64> {
        use Signal as S;
        let v = match signal {
            S::Cohesion => self.cohesion,
            S::Coupling => self.coupling,
            S::Instability => return self.instability,
            S::Abstractness => self.abstractness,
            S::MainSeqDistance => self.main_seq_distance,
            S::BoundaryAlignment => self.boundary_alignment,
            S::LayerViolationCount => self.layer_violation_count as f64,
            S::RoleConsistency => self.role_consistency,
            S::Velocity => self.velocity,
            S::CoordinationCost => self.coordination_cost,
            S::KnowledgeGini => self.knowledge_gini,
            S::ModuleBusFactor => self.module_bus_factor,
            S::MeanCognitiveLoad => self.mean_cognitive_load,
            S::FileCount => self.file_count as f64,
            S::HealthScore => self.health_score,
            _ => return None,
        };
        Some(v)
    }

    pub fn percentile(&self, signal: Signal) -> Option<f64> {
        self.percentiles.get(&signal).copied()
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        Signal::ALL
            .iter()
            .filter_map(|s| self.numeric(*s).map(|v| (s.as_str().to_string(), v)))
            .collect()
    }
}

/// Aggregates over the files directly inside one directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DirectorySignals {
    pub path: String,
    pub file_count: usize,
    pub total_lines: usize,
    pub total_functions: usize,
    pub avg_complexity: f64,
    pub avg_churn: f64,
    pub avg_risk: f64,
    pub dominant_role: Role,
    pub dominant_trajectory: Trajectory,
    pub hotspot_file_count: usize,
    pub high_risk_file_count: usize,
    pub module_path: String,
}

// ============================================================================
// GLOBAL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GlobalSignals {
    pub modularity: f64,
    pub fiedler_value: f64,
    pub spectral_gap: f64,
    pub cycle_count: usize,
    pub centrality_gini: f64,
    pub orphan_ratio: f64,
    pub phantom_ratio: f64,
    pub glue_deficit: f64,
    pub clone_ratio: f64,
    pub violation_rate: f64,
    pub conway_alignment: f64,
    pub team_size: usize,
    pub wiring_score: f64,
    pub architecture_health: f64,
    pub team_risk: f64,
    pub codebase_health: f64,
}

impl GlobalSignals {
    pub fn numeric(&self, signal: Signal) -> Option<f64> {
        use Signal as S;
        let v = match signal {
            S::Modularity => self.modularity,
            S::FiedlerValue => self.fiedler_value,
            S::SpectralGap => self.spectral_gap,
            S::CycleCount => self.cycle_count as f64,
            S::CentralityGini => self.centrality_gini,
            S::OrphanRatio => self.orphan_ratio,
            S::PhantomRatio => self.phantom_ratio,
            S::GlueDeficit => self.glue_deficit,
            S::CloneRatio => self.clone_ratio,
            S::ViolationRate => self.violation_rate,
            S::ConwayAlignment => self.conway_alignment,
            S::TeamSize => self.team_size as f64,
            S::WiringScore => self.wiring_score,
            S::ArchitectureHealth => self.architecture_health,
            S::TeamRisk => self.team_risk,
            S::CodebaseHealth => self.codebase_health,
            _ => return None,
        };
        Some(v)
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        Signal::ALL
            .iter()
            .filter_map(|s| self.numeric(*s).map(|v| (s.as_str().to_string(), v)))
            .collect()
    }
}

// ============================================================================
// FIELD
// ============================================================================

/// Every signal of one run. Built by the fusion pipeline, read-only after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SignalField {
    pub tier: Tier,
    pub per_file: BTreeMap<String, FileSignals>,
    pub per_directory: BTreeMap<String, DirectorySignals>,
    pub per_module: BTreeMap<String, ModuleSignals>,
    pub global_signals: GlobalSignals,
    /// Health Laplacian: own raw risk minus the neighbourhood mean.
    pub delta_h: BTreeMap<String, f64>,
}

impl SignalField {
    pub fn file(&self, path: &str) -> Option<&FileSignals> {
        self.per_file.get(path)
    }

    pub fn module(&self, path: &str) -> Option<&ModuleSignals> {
        self.per_module.get(path)
    }

    pub fn delta_h(&self, path: &str) -> f64 {
        self.delta_h.get(path).copied().unwrap_or(0.0)
    }

    pub fn file_count(&self) -> usize {
        self.per_file.len()
    }

    /// Highest risk first; ties by path.
    pub fn top_files_by_risk(&self, n: usize) -> Vec<&FileSignals> {
        let mut files: Vec<&FileSignals> = self.per_file.values().collect();
        files.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score).then_with(|| a.path.cmp(&b.path)));
        files.truncate(n);
        files
    }

    /// Largest positive delta_h first; ties by path.
    pub fn top_files_by_delta_h(&self, n: usize) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self.delta_h.iter().map(|(p, d)| (p.as_str(), *d)).collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }

    /// Files changed more often than the median of nonzero change counts.
    pub fn hotspot_files(&self) -> Vec<&str> {
        let mut nonzero: Vec<usize> = self
            .per_file
            .values()
            .map(|f| f.total_changes)
            .filter(|c| *c > 0)
            .collect();
        if nonzero.is_empty() {
            return Vec::new();
        }
        nonzero.sort_unstable();
        let median = nonzero[nonzero.len() / 2];
        self.per_file
            .values()
            .filter(|f| f.total_changes > median)
            .map(|f| f.path.as_str())
            .collect()
    }
}
