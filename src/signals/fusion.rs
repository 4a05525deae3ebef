//! Six-stage signal fusion
//!
//! ```text
//! FusionPipeline::new(store, settings)
//!     .collect()          -> Collected      raw per-file, per-module, global values
//!     .raw_risk()         -> RawRisked      max-normalized risk, every tier
//!     .normalize()        -> Normalized     percentiles per tier
//!     .module_temporal()  -> ModuleTemporal velocity, coordination, knowledge
//!     .composites()       -> Composited     risk/health scores (not ABSOLUTE)
//!     .laplacian()        -> SignalField    delta_h
//! ```
//!
//! Each stage consumes the previous one, so stages cannot run out of order
//! or twice. Missing slots leave their signals at defaults.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::composites::{
    compute_file_composites, compute_global_composites, compute_module_health, compute_raw_risk, glue_deficit,
};
use super::laplacian::compute_delta_h;
use super::models::{DirectorySignals, FileSignals, ModuleSignals, SignalField, Tier};
use super::normalization::normalize;
use super::registry::Signal;
use crate::config::AnalysisSettings;
use crate::math::compression::{compression_ratio, CompressionAlgorithm};
use crate::math::gini::gini_of_counts;
use crate::models::{parent_dir, FileMetrics};
use crate::store::FactStore;

/// `log2(lines + 1) · (1 + complexity/10) · (1 + nesting/5) · (1 + gini(function sizes))`
pub fn cognitive_load(fm: &FileMetrics) -> f64 {
    if fm.lines == 0 {
        return 0.0;
    }
    let lines = (fm.lines as f64 + 1.0).log2();
    let gini = if fm.function_sizes.len() > 1 {
        gini_of_counts(&fm.function_sizes, false)
    } else {
        0.0
    };
    lines * (1.0 + fm.complexity_score / 10.0) * (1.0 + fm.nesting_depth as f64 / 5.0) * (1.0 + gini)
}

fn most_common<T: Ord + Clone, I: IntoIterator<Item = T>>(items: I) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(T, usize)>, (k, c)| match best {
            Some((_, bc)) if bc >= c => best,
            _ => Some((k, c)),
        })
        .map(|(k, _)| k)
}

pub struct FusionPipeline<'a> {
    store: &'a FactStore,
    settings: &'a AnalysisSettings,
}

pub struct Collected<'a> {
    store: &'a FactStore,
    settings: &'a AnalysisSettings,
    field: SignalField,
}

pub struct RawRisked<'a> {
    store: &'a FactStore,
    settings: &'a AnalysisSettings,
    field: SignalField,
}

pub struct Normalized<'a> {
    store: &'a FactStore,
    field: SignalField,
}

pub struct ModuleTemporal<'a> {
    store: &'a FactStore,
    field: SignalField,
}

pub struct Composited<'a> {
    store: &'a FactStore,
    field: SignalField,
}

impl<'a> FusionPipeline<'a> {
    pub fn new(store: &'a FactStore, settings: &'a AnalysisSettings) -> Self {
        Self { store, settings }
    }

    /// Runs every stage.
    pub fn run(self) -> SignalField {
        self.collect()
            .raw_risk()
            .normalize()
            .module_temporal()
            .composites()
            .laplacian()
    }

    pub fn collect(self) -> Collected<'a> {
        let store = self.store;
        let mut field = SignalField::default();

        for fm in store.file_metrics.get().into_iter().flatten() {
            let mut fs = FileSignals::new(fm.path.clone());
            self.fill_scanning(&mut fs, fm);
            self.fill_graph(&mut fs);
            self.fill_semantics(&mut fs);
            self.fill_temporal(&mut fs);
            field.per_file.insert(fm.path.clone(), fs);
        }

        field.tier = Tier::for_file_count(
            field.per_file.len(),
            self.settings.absolute_tier_max_files,
            self.settings.full_tier_min_files,
        );

        self.fill_hierarchy(&mut field);
        collect_directories(&mut field);
        self.collect_modules(&mut field);
        self.collect_global(&mut field);

        debug!(
            "Fusion collect: {} files, {} modules, tier {}",
            field.per_file.len(),
            field.per_module.len(),
            field.tier
        );
        Collected {
            store: self.store,
            settings: self.settings,
            field,
        }
    }

    fn fill_scanning(&self, fs: &mut FileSignals, fm: &FileMetrics) {
        fs.lines = fm.lines;
        fs.function_count = fm.functions;
        fs.class_count = fm.structs;
        fs.max_nesting = fm.nesting_depth;
        fs.import_count = fm.imports.len();
        if fm.function_sizes.len() > 1 {
            fs.impl_gini = gini_of_counts(&fm.function_sizes, false);
        }
        fs.cognitive_load = cognitive_load(fm);

        if let Some(syntax) = self.store.file_syntax.get().and_then(|s| s.get(&fm.path)) {
            fs.stub_ratio = syntax.stub_ratio();
            if fm.function_sizes.len() <= 1 {
                fs.impl_gini = syntax.impl_gini();
            }
        }
        if let Some(content) = self.store.file_contents.get().and_then(|c| c.get(&fm.path)) {
            fs.compression_ratio = compression_ratio(content.as_bytes(), CompressionAlgorithm::Zlib).unwrap_or(0.0);
        }
    }

    fn fill_graph(&self, fs: &mut FileSignals) {
        let Some(structural) = self.store.structural.get() else {
            return;
        };
        let (graph, analysis) = (&structural.graph, &structural.analysis);
        let path = fs.path.as_str();

        fs.pagerank = analysis.pagerank.get(path).copied().unwrap_or(0.0);
        fs.betweenness = analysis.betweenness.get(path).copied().unwrap_or(0.0);
        fs.in_degree = graph.in_degree(path);
        fs.out_degree = graph.out_degree(path);
        fs.blast_radius_size = analysis.blast_radius_size.get(path).copied().unwrap_or(0);
        fs.depth = analysis.depth.get(path).copied().unwrap_or(-1);
        fs.is_orphan = analysis.is_orphan(path);
        fs.phantom_import_count = graph.unresolved_imports.get(path).map_or(0, Vec::len);
        fs.community = analysis.node_community.get(path).map_or(-1, |c| i64::from(*c));
    }

    fn fill_semantics(&self, fs: &mut FileSignals) {
        if let Some(role) = self.store.roles.get().and_then(|r| r.get(&fs.path)) {
            fs.role = *role;
        }
        let Some(sem) = self.store.semantics.get().and_then(|s| s.get(&fs.path)) else {
            return;
        };
        fs.concept_count = sem.concept_count;
        fs.concept_entropy = sem.concept_entropy;
        fs.naming_drift = sem.naming_drift;
        fs.todo_density = sem.todo_density;
        fs.docstring_coverage = sem.docstring_coverage;
        fs.semantic_coherence = sem.semantic_coherence;
    }

    fn fill_temporal(&self, fs: &mut FileSignals) {
        let Some(churn) = self.store.churn.get().and_then(|c| c.get(&fs.path)) else {
            return;
        };
        fs.total_changes = churn.total_changes;
        fs.churn_trajectory = churn.trajectory;
        fs.churn_slope = churn.slope;
        fs.churn_cv = churn.cv;
        fs.bus_factor = churn.bus_factor;
        fs.author_entropy = churn.author_entropy;
        fs.fix_ratio = churn.fix_ratio;
        fs.refactor_ratio = churn.refactor_ratio;
        fs.change_entropy = churn.change_entropy;
    }

    fn fill_hierarchy(&self, field: &mut SignalField) {
        let mut dir_sizes: BTreeMap<String, usize> = BTreeMap::new();
        for path in field.per_file.keys() {
            *dir_sizes.entry(parent_dir(path)).or_insert(0) += 1;
        }
        let arch = self.store.architecture.get();
        for (path, fs) in field.per_file.iter_mut() {
            let parent = parent_dir(path);
            fs.dir_depth = path.matches('/').count();
            fs.siblings_count = dir_sizes.get(&parent).copied().unwrap_or(1).saturating_sub(1);
            fs.module_path = arch
                .and_then(|a| a.module_of(path))
                .map_or_else(|| parent.clone(), |m| m.path.clone());
            fs.parent_dir = parent;
        }
    }

    fn collect_modules(&self, field: &mut SignalField) {
        let Some(arch) = self.store.architecture.get() else {
            return;
        };
        for (path, module) in &arch.modules {
            let mut ms = ModuleSignals::new(path.clone());
            ms.cohesion = module.cohesion;
            ms.coupling = module.coupling;
            ms.instability = module.instability;
            ms.abstractness = module.abstractness;
            ms.main_seq_distance = module.main_seq_distance;
            ms.boundary_alignment = module.boundary_alignment;
            ms.role_consistency = module.role_consistency;
            ms.file_count = module.file_count();
            ms.layer_violation_count = arch.violations_from(path).count();
            field.per_module.insert(path.clone(), ms);
        }
    }

    fn collect_global(&self, field: &mut SignalField) {
        let store = self.store;
        let total = field.per_file.len();
        let g = &mut field.global_signals;

        if let Some(structural) = store.structural.get() {
            g.modularity = structural.analysis.modularity;
            g.cycle_count = structural.analysis.cycles.len();
            g.centrality_gini = structural.analysis.centrality_gini;
        }
        if let Some(spectral) = store.spectral.get() {
            g.fiedler_value = spectral.fiedler_value;
            g.spectral_gap = spectral.spectral_gap;
        }
        if total > 0 {
            let orphans = field.per_file.values().filter(|f| f.is_orphan).count();
            let phantoms = field.per_file.values().filter(|f| f.phantom_import_count > 0).count();
            g.orphan_ratio = orphans as f64 / total as f64;
            g.phantom_ratio = phantoms as f64 / total as f64;
        }
        if let Some(pairs) = store.clone_pairs.get() {
            g.clone_ratio = crate::graph::compute_clone_ratio(pairs, total);
        }
        if let Some(arch) = store.architecture.get() {
            g.violation_rate = arch.violation_rate;
        }
        g.conway_alignment = conway_alignment(store);
        g.team_size = store
            .git_history
            .get()
            .map(|h| h.authors().len())
            .filter(|n| *n > 0)
            .unwrap_or(1);

        let deficit = glue_deficit(field);
        field.global_signals.glue_deficit = deficit;
    }
}

/// 1 − mean author distance over file pairs in structurally coupled
/// modules; 1.0 when there is nothing to compare.
fn conway_alignment(store: &FactStore) -> f64 {
    let (Some(distances), Some(arch)) = (store.author_distances.get(), store.architecture.get()) else {
        return 1.0;
    };
    let module_of: BTreeMap<&str, &str> = arch
        .modules
        .iter()
        .flat_map(|(m, module)| module.files.iter().map(move |f| (f.as_str(), m.as_str())))
        .collect();
    let coupled = |a: &str, b: &str| {
        arch.module_graph.get(a).is_some_and(|t| t.contains_key(b))
            || arch.module_graph.get(b).is_some_and(|t| t.contains_key(a))
    };

    let pair_distances: Vec<f64> = distances
        .iter()
        .filter_map(|d| {
            let (ma, mb) = (module_of.get(d.file_a.as_str())?, module_of.get(d.file_b.as_str())?);
            (ma != mb && coupled(ma, mb)).then_some(d.distance)
        })
        .collect();
    if pair_distances.is_empty() {
        return 1.0;
    }
    let mean = pair_distances.iter().sum::<f64>() / pair_distances.len() as f64;
    (1.0 - mean).max(0.0)
}

fn collect_directories(field: &mut SignalField) {
    let mut changes: Vec<usize> = field.per_file.values().map(|f| f.total_changes).collect();
    changes.sort_unstable();
    let median = changes.get(changes.len() / 2).copied().unwrap_or(0);

    let mut by_dir: BTreeMap<&str, Vec<&FileSignals>> = BTreeMap::new();
    for fs in field.per_file.values() {
        by_dir.entry(fs.parent_dir.as_str()).or_default().push(fs);
    }

    let directories: BTreeMap<String, DirectorySignals> = by_dir
        .into_iter()
        .map(|(dir, files)| {
            let n = files.len() as f64;
            let ds = DirectorySignals {
                path: dir.to_string(),
                file_count: files.len(),
                total_lines: files.iter().map(|f| f.lines).sum(),
                total_functions: files.iter().map(|f| f.function_count).sum(),
                avg_complexity: files.iter().map(|f| f.cognitive_load).sum::<f64>() / n,
                avg_churn: files.iter().map(|f| f.total_changes as f64).sum::<f64>() / n,
                avg_risk: files.iter().map(|f| f.risk_score).sum::<f64>() / n,
                dominant_role: most_common(files.iter().map(|f| f.role)).unwrap_or_default(),
                dominant_trajectory: most_common(files.iter().map(|f| f.churn_trajectory)).unwrap_or_default(),
                hotspot_file_count: files.iter().filter(|f| f.total_changes > median).count(),
                high_risk_file_count: files.iter().filter(|f| f.risk_score > 0.7).count(),
                module_path: most_common(files.iter().map(|f| f.module_path.clone())).unwrap_or_default(),
            };
            (dir.to_string(), ds)
        })
        .collect();
    field.per_directory = directories;
}

impl<'a> Collected<'a> {
    pub fn raw_risk(mut self) -> RawRisked<'a> {
        compute_raw_risk(&mut self.field);
        RawRisked {
            store: self.store,
            settings: self.settings,
            field: self.field,
        }
    }
}

impl<'a> RawRisked<'a> {
    pub fn normalize(mut self) -> Normalized<'a> {
        normalize(&mut self.field, self.settings.bayesian_prior_strength);
        Normalized {
            store: self.store,
            field: self.field,
        }
    }
}

impl<'a> Normalized<'a> {
    /// Module aggregates that need percentiles (critical files) or history.
    pub fn module_temporal(mut self) -> ModuleTemporal<'a> {
        let store = self.store;
        let field = &mut self.field;

        let module_files: BTreeMap<String, BTreeSet<String>> = field
            .per_module
            .keys()
            .map(|m| {
                let files = field
                    .per_file
                    .values()
                    .filter(|f| &f.module_path == m)
                    .map(|f| f.path.clone())
                    .collect();
                (m.clone(), files)
            })
            .collect();

        for (path, ms) in field.per_module.iter_mut() {
            let files: Vec<&FileSignals> = module_files
                .get(path)
                .into_iter()
                .flatten()
                .filter_map(|f| field.per_file.get(f))
                .collect();
            if !files.is_empty() {
                ms.mean_cognitive_load = files.iter().map(|f| f.cognitive_load).sum::<f64>() / files.len() as f64;
            }

            let (Some(history), Some(members)) = (store.git_history.get(), module_files.get(path)) else {
                continue;
            };
            let commits: Vec<&crate::temporal::Commit> = history
                .commits
                .iter()
                .filter(|c| c.files.iter().any(|f| members.contains(f)))
                .collect();

            let weeks = (history.span_days as f64 / 7.0).max(1.0);
            ms.velocity = commits.len() as f64 / weeks;

            let mut author_counts: BTreeMap<&str, usize> = BTreeMap::new();
            for c in &commits {
                *author_counts.entry(c.author.as_str()).or_insert(0) += 1;
            }
            if !commits.is_empty() {
                ms.coordination_cost = author_counts.len() as f64 / commits.len() as f64;
            }
            if author_counts.len() > 1 {
                let counts: Vec<usize> = author_counts.values().copied().collect();
                ms.knowledge_gini = gini_of_counts(&counts, false);
            }

            let critical: Vec<f64> = files
                .iter()
                .filter(|f| f.percentile(Signal::Pagerank).is_some_and(|p| p > 0.75))
                .map(|f| f.bus_factor)
                .collect();
            ms.module_bus_factor = if !critical.is_empty() {
                critical.iter().copied().fold(f64::INFINITY, f64::min)
            } else if !files.is_empty() {
                files.iter().map(|f| f.bus_factor).sum::<f64>() / files.len() as f64
            } else {
                1.0
            };
        }

        ModuleTemporal {
            store: self.store,
            field: self.field,
        }
    }
}

impl<'a> ModuleTemporal<'a> {
    pub fn composites(mut self) -> Composited<'a> {
        if self.field.tier != Tier::Absolute {
            compute_file_composites(&mut self.field);
            compute_module_health(&mut self.field);
            compute_global_composites(&mut self.field);
            collect_directories(&mut self.field);
        } else {
            debug!("ABSOLUTE tier: composites skipped");
        }
        Composited {
            store: self.store,
            field: self.field,
        }
    }
}

impl Composited<'_> {
    pub fn laplacian(mut self) -> SignalField {
        if let Some(structural) = self.store.structural.get() {
            self.field.delta_h = compute_delta_h(&self.field, &structural.graph);
        } else {
            self.field.delta_h = self.field.per_file.keys().map(|p| (p.clone(), 0.0)).collect();
        }
        self.field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{analyze_structure, DependencyGraph, StructuralResult};
    use crate::temporal::{Commit, GitHistory};

    fn metrics(path: &str, lines: usize) -> FileMetrics {
        FileMetrics {
            path: path.into(),
            lines,
            functions: 2,
            complexity_score: 2.0,
            nesting_depth: 1,
            function_sizes: vec![10, 30],
            ..Default::default()
        }
    }

    fn store_with(paths: &[&str], edges: &[(&str, &str)]) -> FactStore {
        let mut store = FactStore::new(".");
        store.ingest_scan(
            paths.iter().map(|p| metrics(p, 120)).collect(),
            BTreeMap::new(),
            BTreeMap::new(),
        );
        let graph = DependencyGraph::from_edges(paths.iter().copied(), edges);
        let analysis = analyze_structure(&graph, &BTreeMap::new(), &AnalysisSettings::default()).unwrap();
        store.structural.set(StructuralResult { graph, analysis }, "structural");
        store
    }

    #[test]
    fn test_cognitive_load_formula() {
        let fm = metrics("a.py", 127);
        let gini = gini_of_counts(&[10, 30], false);
        let expected = 7.0 * 1.2 * 1.2 * (1.0 + gini);
        assert!((cognitive_load(&fm) - expected).abs() < 1e-9);
        assert_eq!(cognitive_load(&FileMetrics::default()), 0.0);
    }

    #[test]
    fn test_most_common_trajectory() {
        use crate::temporal::Trajectory;
        let t = [Trajectory::Stable, Trajectory::Churning, Trajectory::Churning];
        assert_eq!(most_common(t), Some(Trajectory::Churning));
        // ties go to the variant that sorts first
        assert_eq!(most_common([Trajectory::Spiking, Trajectory::Dormant]), Some(Trajectory::Dormant));
        assert_eq!(most_common(Vec::<Trajectory>::new()), None);
    }

    #[test]
    fn test_small_codebase_is_absolute_without_composites() {
        let store = store_with(&["a.py", "b.py", "c.py"], &[("a.py", "b.py"), ("b.py", "c.py")]);
        let settings = AnalysisSettings::default();
        let field = FusionPipeline::new(&store, &settings).run();

        assert_eq!(field.tier, Tier::Absolute);
        assert_eq!(field.per_file.len(), 3);
        assert!(field.per_file.values().all(|f| f.percentiles.is_empty()));
        assert_eq!(field.per_file["a.py"].risk_score, 0.0);
        assert!(field.per_file["c.py"].raw_risk > 0.0);
        assert_eq!(field.delta_h.len(), 3);
        assert_eq!(field.per_directory["."].file_count, 3);
    }

    #[test]
    fn test_bayesian_tier_fills_composites() {
        let paths: Vec<String> = (0..20).map(|i| format!("pkg/m{i:02}.py")).collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = refs.windows(2).map(|w| (w[0], w[1])).collect();
        let store = store_with(&refs, &edges);
        let settings = AnalysisSettings::default();
        let field = FusionPipeline::new(&store, &settings).run();

        assert_eq!(field.tier, Tier::Bayesian);
        let f = &field.per_file["pkg/m05.py"];
        assert!(f.percentile(Signal::Pagerank).is_some());
        assert!(f.risk_score > 0.0);
        assert!((0.0..=1.0).contains(&f.file_health_score));
        assert!(field.global_signals.codebase_health > 0.0);
        assert_eq!(field.global_signals.team_size, 1);
        assert_eq!(field.global_signals.conway_alignment, 1.0);
    }

    #[test]
    fn test_hierarchy_and_temporal_fill() {
        let mut store = store_with(&["src/a.py", "src/b.py", "main.py"], &[("main.py", "src/a.py")]);
        let history = GitHistory::from_commits(vec![
            Commit {
                hash: "1".into(),
                timestamp: 0,
                author: "ann".into(),
                files: vec!["src/a.py".into()],
                subject: "init".into(),
            },
            Commit {
                hash: "2".into(),
                timestamp: 86_400 * 14,
                author: "bob".into(),
                files: vec!["src/a.py".into(), "src/b.py".into()],
                subject: "fix".into(),
            },
        ]);
        store.git_history.set(history, "temporal");
        let settings = AnalysisSettings::default();
        let field = FusionPipeline::new(&store, &settings).run();

        let a = &field.per_file["src/a.py"];
        assert_eq!(a.parent_dir, "src");
        assert_eq!(a.dir_depth, 1);
        assert_eq!(a.siblings_count, 1);
        assert_eq!(field.per_file["main.py"].parent_dir, ".");
        assert_eq!(field.global_signals.team_size, 2);
    }
}
