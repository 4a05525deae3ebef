//! Signal enum and registry
//!
//! Every metric is one `Signal` variant. The registry maps each variant to
//! its `SignalMeta` (type, scope, polarity, percentileability, absolute
//! threshold, producer, phase). The built-in table is constructed once and
//! shared by reference; nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

macro_rules! signals {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Every signal the engine computes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Signal {
            $($variant),+
        }

        impl Signal {
            pub const ALL: &'static [Signal] = &[$(Signal::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Signal::$variant => $name),+
                }
            }
        }

        impl FromStr for Signal {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Signal::$variant),)+
                    other => Err(format!("unknown signal: {other}")),
                }
            }
        }
    };
}

signals! {
    // per-file: scanning
    Lines => "lines",
    FunctionCount => "function_count",
    ClassCount => "class_count",
    MaxNesting => "max_nesting",
    ImplGini => "impl_gini",
    StubRatio => "stub_ratio",
    ImportCount => "import_count",
    // per-file: semantics
    Role => "role",
    ConceptCount => "concept_count",
    ConceptEntropy => "concept_entropy",
    NamingDrift => "naming_drift",
    TodoDensity => "todo_density",
    DocstringCoverage => "docstring_coverage",
    // per-file: graph
    Pagerank => "pagerank",
    Betweenness => "betweenness",
    InDegree => "in_degree",
    OutDegree => "out_degree",
    BlastRadiusSize => "blast_radius_size",
    Depth => "depth",
    IsOrphan => "is_orphan",
    PhantomImportCount => "phantom_import_count",
    Community => "community",
    CompressionRatio => "compression_ratio",
    SemanticCoherence => "semantic_coherence",
    CognitiveLoad => "cognitive_load",
    // per-file: temporal
    TotalChanges => "total_changes",
    ChurnTrajectory => "churn_trajectory",
    ChurnSlope => "churn_slope",
    ChurnCv => "churn_cv",
    BusFactor => "bus_factor",
    AuthorEntropy => "author_entropy",
    FixRatio => "fix_ratio",
    RefactorRatio => "refactor_ratio",
    ChangeEntropy => "change_entropy",
    // per-file: fusion
    RawRisk => "raw_risk",
    RiskScore => "risk_score",
    WiringQuality => "wiring_quality",
    FileHealthScore => "file_health_score",
    // per-module
    Cohesion => "cohesion",
    Coupling => "coupling",
    Instability => "instability",
    Abstractness => "abstractness",
    MainSeqDistance => "main_seq_distance",
    BoundaryAlignment => "boundary_alignment",
    LayerViolationCount => "layer_violation_count",
    RoleConsistency => "role_consistency",
    Velocity => "velocity",
    CoordinationCost => "coordination_cost",
    KnowledgeGini => "knowledge_gini",
    ModuleBusFactor => "module_bus_factor",
    MeanCognitiveLoad => "mean_cognitive_load",
    FileCount => "file_count",
    HealthScore => "health_score",
    // global
    Modularity => "modularity",
    FiedlerValue => "fiedler_value",
    SpectralGap => "spectral_gap",
    CycleCount => "cycle_count",
    CentralityGini => "centrality_gini",
    OrphanRatio => "orphan_ratio",
    PhantomRatio => "phantom_ratio",
    GlueDeficit => "glue_deficit",
    CloneRatio => "clone_ratio",
    ViolationRate => "violation_rate",
    ConwayAlignment => "conway_alignment",
    TeamSize => "team_size",
    WiringScore => "wiring_score",
    ArchitectureHealth => "architecture_health",
    TeamRisk => "team_risk",
    CodebaseHealth => "codebase_health",
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to read a high value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HighIsBad,
    HighIsGood,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalScope {
    File,
    Module,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Int,
    Float,
    Bool,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalMeta {
    pub signal: Signal,
    pub dtype: SignalType,
    pub scope: SignalScope,
    /// False for enums, booleans, ids, composites and single global values.
    pub percentileable: bool,
    pub polarity: Polarity,
    /// Cutoff used by finders in the ABSOLUTE tier; `None` means the signal
    /// cannot be evaluated there.
    pub absolute_threshold: Option<f64>,
    pub produced_by: &'static str,
    /// Earliest phase (0-5) at which the value exists.
    pub phase: u8,
    pub nullable: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("signal {signal} already registered by {existing}, rejected from {attempted}")]
    DuplicateProducer {
        signal: Signal,
        existing: &'static str,
        attempted: &'static str,
    },

    #[error("signals without metadata: {0:?}")]
    Incomplete(Vec<Signal>),
}

#[derive(Debug, Clone, Default)]
pub struct SignalRegistry {
    metas: BTreeMap<Signal, SignalMeta>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `meta`. Re-registration from the same producer replaces
    /// the entry; from a different producer it is rejected.
    pub fn register(&mut self, meta: SignalMeta) -> Result<(), RegistryError> {
        if let Some(existing) = self.metas.get(&meta.signal) {
            if existing.produced_by != meta.produced_by {
                return Err(RegistryError::DuplicateProducer {
                    signal: meta.signal,
                    existing: existing.produced_by,
                    attempted: meta.produced_by,
                });
            }
        }
        self.metas.insert(meta.signal, meta);
        Ok(())
    }

    /// Every `Signal` variant must have metadata.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let missing: Vec<Signal> = Signal::ALL.iter().copied().filter(|s| !self.metas.contains_key(s)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Incomplete(missing))
        }
    }

    pub fn get(&self, signal: Signal) -> Option<&SignalMeta> {
        self.metas.get(&signal)
    }

    pub fn polarity(&self, signal: Signal) -> Polarity {
        self.get(signal).map_or(Polarity::Neutral, |m| m.polarity)
    }

    pub fn absolute_threshold(&self, signal: Signal) -> Option<f64> {
        self.get(signal).and_then(|m| m.absolute_threshold)
    }

    pub fn is_percentileable(&self, signal: Signal) -> bool {
        self.get(signal).is_some_and(|m| m.percentileable)
    }

    pub fn percentileable(&self, scope: SignalScope) -> impl Iterator<Item = Signal> + '_ {
        self.metas
            .values()
            .filter(move |m| m.percentileable && m.scope == scope)
            .map(|m| m.signal)
    }

    pub fn by_scope(&self, scope: SignalScope) -> impl Iterator<Item = &SignalMeta> + '_ {
        self.metas.values().filter(move |m| m.scope == scope)
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }
}

/// Process-wide built-in registry.
pub fn registry() -> &'static SignalRegistry {
    static REGISTRY: OnceLock<SignalRegistry> = OnceLock::new();
    REGISTRY.get_or_init(builtin)
}

/// Polarity of a signal by name; unknown names are neutral.
pub fn polarity_of(name: &str) -> Polarity {
    name.parse::<Signal>().map_or(Polarity::Neutral, |s| registry().polarity(s))
}

// ============================================================================
// BUILT-IN TABLE
// ============================================================================

struct Row(Signal, SignalType, SignalScope, bool, Polarity, Option<f64>, &'static str, u8);

fn builtin() -> SignalRegistry {
    use Polarity::*;
    use Signal as S;
    use SignalScope::{File as F, Global as G, Module as M};
    use SignalType::*;

    let rows = [
        Row(S::Lines, Int, F, true, HighIsBad, Some(500.0), "scanning", 0),
        Row(S::FunctionCount, Int, F, true, HighIsBad, Some(30.0), "scanning", 0),
        Row(S::ClassCount, Int, F, true, Neutral, None, "scanning", 0),
        Row(S::MaxNesting, Int, F, true, HighIsBad, Some(4.0), "scanning", 0),
        Row(S::ImplGini, Float, F, true, HighIsBad, Some(0.6), "scanning", 1),
        Row(S::StubRatio, Float, F, true, HighIsBad, Some(0.5), "scanning", 1),
        Row(S::ImportCount, Int, F, true, Neutral, None, "scanning", 0),
        Row(S::Role, Text, F, false, Neutral, None, "semantics/roles", 2),
        Row(S::ConceptCount, Int, F, true, HighIsBad, None, "semantics", 2),
        Row(S::ConceptEntropy, Float, F, true, HighIsBad, Some(1.5), "semantics", 2),
        Row(S::NamingDrift, Float, F, true, HighIsBad, Some(0.7), "semantics", 2),
        Row(S::TodoDensity, Float, F, true, HighIsBad, Some(0.05), "semantics", 2),
        Row(S::DocstringCoverage, Float, F, true, HighIsGood, None, "semantics", 2),
        Row(S::Pagerank, Float, F, true, HighIsBad, None, "graph/structural", 3),
        Row(S::Betweenness, Float, F, true, HighIsBad, None, "graph/structural", 3),
        Row(S::InDegree, Int, F, true, Neutral, None, "graph/structural", 3),
        Row(S::OutDegree, Int, F, true, Neutral, None, "graph/structural", 3),
        Row(S::BlastRadiusSize, Int, F, true, HighIsBad, None, "graph/structural", 3),
        Row(S::Depth, Int, F, false, Neutral, None, "graph/structural", 3),
        Row(S::IsOrphan, Bool, F, false, HighIsBad, None, "graph/structural", 3),
        Row(S::PhantomImportCount, Int, F, true, HighIsBad, Some(0.0), "graph/structural", 3),
        Row(S::Community, Int, F, false, Neutral, None, "graph/structural", 3),
        Row(S::CompressionRatio, Float, F, true, Neutral, None, "signals/fusion", 3),
        Row(S::SemanticCoherence, Float, F, true, HighIsGood, None, "semantics", 2),
        Row(S::CognitiveLoad, Float, F, true, HighIsBad, None, "signals/fusion", 3),
        Row(S::TotalChanges, Int, F, true, HighIsBad, None, "temporal/churn", 3),
        Row(S::ChurnTrajectory, Text, F, false, Neutral, None, "temporal/churn", 3),
        Row(S::ChurnSlope, Float, F, true, HighIsBad, None, "temporal/churn", 3),
        Row(S::ChurnCv, Float, F, true, HighIsBad, Some(1.0), "temporal/churn", 3),
        Row(S::BusFactor, Float, F, true, HighIsGood, Some(1.0), "temporal/churn", 3),
        Row(S::AuthorEntropy, Float, F, true, HighIsGood, None, "temporal/churn", 3),
        Row(S::FixRatio, Float, F, true, HighIsBad, Some(0.4), "temporal/churn", 3),
        Row(S::RefactorRatio, Float, F, true, HighIsGood, None, "temporal/churn", 3),
        Row(S::ChangeEntropy, Float, F, true, HighIsBad, None, "temporal/churn", 3),
        Row(S::RawRisk, Float, F, false, HighIsBad, None, "signals/fusion", 5),
        Row(S::RiskScore, Float, F, false, HighIsBad, None, "signals/fusion", 5),
        Row(S::WiringQuality, Float, F, false, HighIsGood, None, "signals/fusion", 5),
        Row(S::FileHealthScore, Float, F, false, HighIsGood, None, "signals/fusion", 5),
        Row(S::Cohesion, Float, M, true, HighIsGood, None, "architecture", 4),
        Row(S::Coupling, Float, M, true, HighIsBad, None, "architecture", 4),
        Row(S::Instability, Float, M, true, Neutral, None, "architecture", 4),
        Row(S::Abstractness, Float, M, true, Neutral, None, "architecture", 4),
        Row(S::MainSeqDistance, Float, M, true, HighIsBad, None, "architecture", 4),
        Row(S::BoundaryAlignment, Float, M, true, HighIsGood, None, "architecture", 4),
        Row(S::LayerViolationCount, Int, M, true, HighIsBad, None, "architecture", 4),
        Row(S::RoleConsistency, Float, M, true, HighIsGood, None, "architecture", 4),
        Row(S::Velocity, Float, M, true, Neutral, None, "signals/fusion", 5),
        Row(S::CoordinationCost, Float, M, true, HighIsBad, None, "signals/fusion", 5),
        Row(S::KnowledgeGini, Float, M, true, HighIsBad, None, "signals/fusion", 5),
        Row(S::ModuleBusFactor, Float, M, true, HighIsGood, None, "signals/fusion", 5),
        Row(S::MeanCognitiveLoad, Float, M, true, HighIsBad, None, "signals/fusion", 5),
        Row(S::FileCount, Int, M, true, Neutral, None, "architecture", 4),
        Row(S::HealthScore, Float, M, false, HighIsGood, None, "signals/fusion", 5),
        Row(S::Modularity, Float, G, false, HighIsGood, None, "graph/structural", 3),
        Row(S::FiedlerValue, Float, G, false, HighIsGood, None, "graph/spectral", 3),
        Row(S::SpectralGap, Float, G, false, HighIsGood, None, "graph/spectral", 3),
        Row(S::CycleCount, Int, G, false, HighIsBad, None, "graph/structural", 3),
        Row(S::CentralityGini, Float, G, false, HighIsBad, None, "graph/structural", 3),
        Row(S::OrphanRatio, Float, G, false, HighIsBad, None, "signals/fusion", 5),
        Row(S::PhantomRatio, Float, G, false, HighIsBad, None, "signals/fusion", 5),
        Row(S::GlueDeficit, Float, G, false, HighIsBad, None, "signals/fusion", 5),
        Row(S::CloneRatio, Float, G, false, HighIsBad, None, "graph/clones", 3),
        Row(S::ViolationRate, Float, G, false, HighIsBad, None, "architecture", 4),
        Row(S::ConwayAlignment, Float, G, false, HighIsGood, None, "signals/fusion", 5),
        Row(S::TeamSize, Int, G, false, Neutral, None, "temporal", 3),
        Row(S::WiringScore, Float, G, false, HighIsGood, None, "signals/fusion", 5),
        Row(S::ArchitectureHealth, Float, G, false, HighIsGood, None, "signals/fusion", 5),
        Row(S::TeamRisk, Float, G, false, HighIsBad, None, "signals/fusion", 5),
        Row(S::CodebaseHealth, Float, G, false, HighIsGood, None, "signals/fusion", 5),
    ];

    let mut registry = SignalRegistry::new();
    for Row(signal, dtype, scope, percentileable, polarity, absolute_threshold, produced_by, phase) in rows {
        // the table has one row per signal, so registration cannot collide
        let nullable = matches!(signal, S::DocstringCoverage | S::Instability);
        let _ = registry.register(SignalMeta {
            signal,
            dtype,
            scope,
            percentileable,
            polarity,
            absolute_threshold,
            produced_by,
            phase,
            nullable,
        });
    }
    registry
}
