//! Raw risk and composite scores
//!
//! Raw risk uses max-normalized inputs and exists in every tier. The other
//! composites read percentiles, so they are skipped in the ABSOLUTE tier.
//!
//! File:
//! - `risk_score = 0.25·P(pagerank) + 0.20·P(blast) + 0.20·P(cognitive) + 0.20·instability + 0.15·(1 − bf/max_bf)`
//! - `wiring_quality = 1 − (0.30·orphan + 0.25·stub + 0.25·phantom/imports + 0.20·broken/edges)`
//! - `file_health_score = 1 − (0.25·risk + 0.25·(1 − wiring) + 0.20·P(cognitive) + 0.15·stub + 0.15·orphan)`
//!
//! Module:
//! - `health = 0.20·cohesion + 0.15·(1 − coupling) + 0.20·(1 − D) + 0.15·boundary + 0.15·role_consistency + 0.15·(1 − mean stub)`;
//!   without instability the D term is dropped and the rest scaled by 1.25
//!
//! Global:
//! - `wiring_score = 1 − (0.25·orphan_ratio + 0.25·phantom_ratio + 0.20·glue_deficit + 0.15·mean stub + 0.15·clone_ratio)`
//! - `architecture_health = 0.25·(1 − violation_rate) + 0.20·cohesion + 0.20·(1 − coupling) + 0.20·(1 − D) + 0.15·boundary`
//! - `team_risk = 1 − (0.30·min(bf,3)/3 + 0.25·(1 − knowledge_gini) + 0.25·(1 − min(coord,5)/5) + 0.20·conway)`
//! - `codebase_health = 0.30·architecture + 0.30·wiring + 0.20·min(bf,team)/team + 0.20·modularity`

use super::models::{FileSignals, SignalField};
use super::registry::Signal;

fn ratio(v: f64, max: f64) -> f64 {
    if max > 0.0 {
        v / max
    } else {
        0.0
    }
}

fn instability_factor(fs: &FileSignals) -> f64 {
    if fs.churn_trajectory.is_volatile() {
        1.0
    } else {
        0.3
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn median_lower_index(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    values[values.len() / 2]
}

/// Fills `raw_risk` for every file.
pub fn compute_raw_risk(field: &mut SignalField) {
    let files = field.per_file.values();
    let (max_pr, max_blast, max_cog, max_bf) = files.fold((0.0f64, 0.0f64, 0.0f64, 0.0f64), |acc, f| {
        (
            acc.0.max(f.pagerank),
            acc.1.max(f.blast_radius_size as f64),
            acc.2.max(f.cognitive_load),
            acc.3.max(f.bus_factor),
        )
    });

    for fs in field.per_file.values_mut() {
        let bf_term = if max_bf > 0.0 { 1.0 - fs.bus_factor / max_bf } else { 0.0 };
        let risk = 0.25 * ratio(fs.pagerank, max_pr)
            + 0.20 * ratio(fs.blast_radius_size as f64, max_blast)
            + 0.20 * ratio(fs.cognitive_load, max_cog)
            + 0.20 * instability_factor(fs)
            + 0.15 * bf_term;
        fs.raw_risk = risk.clamp(0.0, 1.0);
    }
}

fn pctl(fs: &FileSignals, signal: Signal) -> f64 {
    fs.percentile(signal).unwrap_or(0.0)
}

/// risk_score, wiring_quality and file_health_score per file.
pub fn compute_file_composites(field: &mut SignalField) {
    let max_bf = field.per_file.values().map(|f| f.bus_factor).fold(0.0, f64::max).max(1.0);

    for fs in field.per_file.values_mut() {
        let risk = 0.25 * pctl(fs, Signal::Pagerank)
            + 0.20 * pctl(fs, Signal::BlastRadiusSize)
            + 0.20 * pctl(fs, Signal::CognitiveLoad)
            + 0.20 * instability_factor(fs)
            + 0.15 * (1.0 - fs.bus_factor / max_bf);
        fs.risk_score = risk.clamp(0.0, 1.0);

        let orphan = if fs.is_orphan { 1.0 } else { 0.0 };
        let phantom = fs.phantom_import_count as f64 / fs.import_count.max(1) as f64;
        // broken call targets are not tracked, so the 0.20 term is always 0
        let wiring = 1.0 - (0.30 * orphan + 0.25 * fs.stub_ratio + 0.25 * phantom);
        fs.wiring_quality = wiring.clamp(0.0, 1.0);

        let health = 1.0
            - (0.25 * fs.risk_score
                + 0.25 * (1.0 - fs.wiring_quality)
                + 0.20 * pctl(fs, Signal::CognitiveLoad)
                + 0.15 * fs.stub_ratio
                + 0.15 * orphan);
        fs.file_health_score = health.clamp(0.0, 1.0);
    }
}

/// health_score per module.
pub fn compute_module_health(field: &mut SignalField) {
    let stub_by_module: std::collections::BTreeMap<String, f64> = field
        .per_module
        .keys()
        .map(|m| {
            let stub = mean(
                field
                    .per_file
                    .values()
                    .filter(|f| &f.module_path == m)
                    .map(|f| f.stub_ratio),
            )
            .unwrap_or(0.0);
            (m.clone(), stub)
        })
        .collect();

    for (path, ms) in field.per_module.iter_mut() {
        let stub = stub_by_module.get(path).copied().unwrap_or(0.0);
        let base = 0.20 * ms.cohesion
            + 0.15 * (1.0 - ms.coupling)
            + 0.15 * ms.boundary_alignment
            + 0.15 * ms.role_consistency
            + 0.15 * (1.0 - stub);
        let health = match ms.instability {
            Some(_) => base + 0.20 * (1.0 - ms.main_seq_distance),
            None => base * 1.25,
        };
        ms.health_score = health.clamp(0.0, 1.0);
    }
}

/// Share of glue files needed but missing: glue files sit above the median
/// on both betweenness and out-degree, and a healthy codebase has about
/// √modules of them.
pub fn glue_deficit(field: &SignalField) -> f64 {
    if field.per_file.is_empty() {
        return 0.0;
    }
    let mut betweenness: Vec<f64> = field.per_file.values().map(|f| f.betweenness).collect();
    let mut out_degree: Vec<f64> = field.per_file.values().map(|f| f.out_degree as f64).collect();
    let med_b = median_lower_index(&mut betweenness);
    let med_o = median_lower_index(&mut out_degree);
    let glue = field
        .per_file
        .values()
        .filter(|f| f.betweenness > med_b && f.out_degree as f64 > med_o)
        .count() as f64;
    let expected = (field.per_module.len() as f64).sqrt().max(1.0);
    (1.0 - glue / expected).clamp(0.0, 1.0)
}

/// Lowest bus factor among central files (pagerank percentile > 0.75), or
/// over all files when no percentiles exist. 1.0 for an empty field.
pub fn critical_bus_factor(field: &SignalField) -> f64 {
    let critical = field
        .per_file
        .values()
        .filter(|f| f.percentile(Signal::Pagerank).is_some_and(|p| p > 0.75))
        .map(|f| f.bus_factor)
        .fold(f64::INFINITY, f64::min);
    if critical.is_finite() {
        return critical;
    }
    let all = field.per_file.values().map(|f| f.bus_factor).fold(f64::INFINITY, f64::min);
    if all.is_finite() {
        all
    } else {
        1.0
    }
}

/// Global composites. Expects module health and every global input filled.
pub fn compute_global_composites(field: &mut SignalField) {
    let mean_stub = mean(field.per_file.values().map(|f| f.stub_ratio)).unwrap_or(0.0);
    let g = &field.global_signals;
    let wiring_score = 1.0
        - (0.25 * g.orphan_ratio
            + 0.25 * g.phantom_ratio
            + 0.20 * g.glue_deficit
            + 0.15 * mean_stub
            + 0.15 * g.clone_ratio);

    let modules = &field.per_module;
    let architecture_health = if modules.is_empty() {
        0.0
    } else {
        let cohesion = mean(modules.values().map(|m| m.cohesion)).unwrap_or(0.0);
        let coupling = mean(modules.values().map(|m| m.coupling)).unwrap_or(0.0);
        let distance = mean(
            modules
                .values()
                .filter(|m| m.instability.is_some())
                .map(|m| m.main_seq_distance),
        )
        .unwrap_or(0.0);
        let boundary = mean(modules.values().map(|m| m.boundary_alignment)).unwrap_or(0.0);
        0.25 * (1.0 - g.violation_rate)
            + 0.20 * cohesion
            + 0.20 * (1.0 - coupling)
            + 0.20 * (1.0 - distance)
            + 0.15 * boundary
    };

    let bus = critical_bus_factor(field);
    let max_gini = modules.values().map(|m| m.knowledge_gini).fold(0.0, f64::max);
    let mean_coord = mean(modules.values().map(|m| m.coordination_cost)).unwrap_or(0.0);
    let team_risk = 1.0
        - (0.30 * bus.min(3.0) / 3.0
            + 0.25 * (1.0 - max_gini)
            + 0.25 * (1.0 - mean_coord.min(5.0) / 5.0)
            + 0.20 * g.conway_alignment);

    let team_size = g.team_size.max(1) as f64;
    let wiring_score = wiring_score.clamp(0.0, 1.0);
    let architecture_health = architecture_health.clamp(0.0, 1.0);
    let codebase_health = 0.30 * architecture_health
        + 0.30 * wiring_score
        + 0.20 * (bus.min(team_size) / team_size)
        + 0.20 * g.modularity;

    let g = &mut field.global_signals;
    g.wiring_score = wiring_score;
    g.architecture_health = architecture_health;
    g.team_risk = team_risk.clamp(0.0, 1.0);
    g.codebase_health = codebase_health.clamp(0.0, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::models::ModuleSignals;
    use crate::temporal::Trajectory;

    fn file(path: &str) -> FileSignals {
        FileSignals::new(path)
    }

    #[test]
    fn test_raw_risk_max_normalized() {
        let mut field = SignalField::default();
        let mut hub = file("hub");
        hub.pagerank = 0.5;
        hub.blast_radius_size = 10;
        hub.cognitive_load = 20.0;
        hub.churn_trajectory = Trajectory::Churning;
        hub.bus_factor = 1.0;
        let mut leaf = file("leaf");
        leaf.pagerank = 0.1;
        leaf.bus_factor = 2.0;
        field.per_file.insert("hub".into(), hub);
        field.per_file.insert("leaf".into(), leaf);

        compute_raw_risk(&mut field);
        // 0.25 + 0.20 + 0.20 + 0.20 + 0.15·0.5
        assert!((field.per_file["hub"].raw_risk - 0.925).abs() < 1e-12);
        // 0.25·0.2 + 0.20·0.3
        assert!((field.per_file["leaf"].raw_risk - 0.11).abs() < 1e-12);
    }

    #[test]
    fn test_raw_risk_all_zero_maxes() {
        let mut field = SignalField::default();
        field.per_file.insert("a".into(), file("a"));
        compute_raw_risk(&mut field);
        // only the stable-trajectory term survives: 0.20·0.3
        assert!((field.per_file["a"].raw_risk - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_file_composites_clean_file() {
        let mut field = SignalField::default();
        field.per_file.insert("a".into(), file("a"));
        compute_file_composites(&mut field);
        let a = &field.per_file["a"];
        assert_eq!(a.wiring_quality, 1.0);
        assert!((a.risk_score - 0.06).abs() < 1e-12);
        assert!((a.file_health_score - (1.0 - 0.25 * 0.06)).abs() < 1e-12);
    }

    #[test]
    fn test_orphan_and_phantoms_lower_wiring() {
        let mut field = SignalField::default();
        let mut f = file("a");
        f.is_orphan = true;
        f.import_count = 4;
        f.phantom_import_count = 2;
        field.per_file.insert("a".into(), f);
        compute_file_composites(&mut field);
        assert!((field.per_file["a"].wiring_quality - (1.0 - 0.30 - 0.125)).abs() < 1e-12);
    }

    #[test]
    fn test_module_health_without_instability_rescales() {
        let mut field = SignalField::default();
        let mut m = ModuleSignals::new("m");
        m.cohesion = 1.0;
        m.boundary_alignment = 1.0;
        m.role_consistency = 1.0;
        field.per_module.insert("m".into(), m);
        compute_module_health(&mut field);
        // (0.20 + 0.15 + 0.15 + 0.15 + 0.15) · 1.25 = 1.0
        assert!((field.per_module["m"].health_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_glue_deficit_without_glue() {
        let mut field = SignalField::default();
        for p in ["a", "b", "c"] {
            field.per_file.insert(p.into(), file(p));
        }
        assert_eq!(glue_deficit(&field), 1.0);
        assert_eq!(glue_deficit(&SignalField::default()), 0.0);
    }

    #[test]
    fn test_global_composites_empty_modules() {
        let mut field = SignalField::default();
        field.per_file.insert("a".into(), file("a"));
        field.global_signals.team_size = 1;
        compute_global_composites(&mut field);
        let g = &field.global_signals;
        assert_eq!(g.architecture_health, 0.0);
        assert_eq!(g.wiring_score, 1.0);
        // 0.30·0 + 0.30·1 + 0.20·1 + 0.20·0
        assert!((g.codebase_health - 0.5).abs() < 1e-12);
    }
}
