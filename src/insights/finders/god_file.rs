//! God file: high cognitive load (or many functions) with low coherence

use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::models::{Effort, Evidence, Finding};
use crate::signals::{FileSignals, Signal, Tier};
use crate::store::FactStore;

use super::by_severity_desc;

const MIN_FILES: usize = 5;
const MIN_FUNCTIONS: usize = 3;
const MANY_FUNCTIONS: usize = 10;
const COGNITIVE_PCTL: f64 = 0.80;
const COHERENCE_PCTL: f64 = 0.30;
const BASE_SEVERITY: f64 = 0.8;

pub struct GodFileFinder;

fn describe_complexity(fs: &FileSignals, cog_pctl: f64) -> String {
    let mut parts = Vec::new();
    if fs.function_count > 0 {
        parts.push(format!("{} functions", fs.function_count));
    }
    if fs.lines > 0 {
        parts.push(format!("{} lines", fs.lines));
    }
    if fs.max_nesting > 3 {
        parts.push(format!("nesting depth {}", fs.max_nesting));
    }
    if parts.is_empty() {
        format!("harder to read than {:.0}% of files", cog_pctl * 100.0)
    } else {
        format!(
            "complex ({}), harder to read than {:.0}% of files",
            parts.join(", "),
            cog_pctl * 100.0
        )
    }
}

fn suggestion(fs: &FileSignals) -> String {
    if fs.function_count > 5 {
        format!(
            "This file has {} functions handling unrelated concerns. Identify clusters of related \
             functions and extract each group into its own module.",
            fs.function_count
        )
    } else {
        "This file mixes unrelated concerns. Split it along the boundaries of what each part does.".to_string()
    }
}

fn evaluate(fs: &FileSignals) -> Option<Finding> {
    if fs.total_changes == 0 || fs.function_count < MIN_FUNCTIONS {
        return None;
    }
    let cog = fs.percentile(Signal::CognitiveLoad).unwrap_or(0.0);
    let coh = fs.percentile(Signal::SemanticCoherence).unwrap_or(1.0);

    let complex = cog >= COGNITIVE_PCTL || fs.function_count > MANY_FUNCTIONS;
    if !complex || coh > COHERENCE_PCTL {
        return None;
    }

    let severity = BASE_SEVERITY * ((cog + (1.0 - coh)) / 2.0).max(0.5);
    Some(
        Finding::new("god_file", severity, format!("God file: {}", fs.path))
            .with_files(vec![fs.path.clone()])
            .with_evidence(vec![
                Evidence::new("cognitive_load", fs.cognitive_load, cog, describe_complexity(fs, cog)),
                Evidence::new(
                    "semantic_coherence",
                    fs.semantic_coherence,
                    coh,
                    format!(
                        "unfocused, code suggests multiple unrelated concerns (less focused than {:.0}% of files)",
                        (1.0 - coh) * 100.0
                    ),
                ),
            ])
            .with_suggestion(suggestion(fs))
            .with_confidence(0.85)
            .with_effort(Effort::High),
    )
}

impl Finder for GodFileFinder {
    fn name(&self) -> &'static str {
        "god_file"
    }

    fn description(&self) -> &'static str {
        "Files that do too many unrelated things"
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Bayesian
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let field = store.signal_field.value()?;
        if field.file_count() < MIN_FILES || field.tier == Tier::Absolute {
            return Ok(Vec::new());
        }
        let mut findings: Vec<Finding> = field.per_file.values().filter_map(evaluate).collect();
        findings.sort_by(by_severity_desc);
        Ok(findings)
    }
}
