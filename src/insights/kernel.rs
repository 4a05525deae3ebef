//! Insight kernel
//!
//! Runs one analysis pass over a populated `FactStore`:
//!
//! ```text
//! post-scan validation
//!   -> wave 1 analyzers (toposorted)
//!   -> post-structural validation
//!   -> wave 2 analyzers (fusion)
//!   -> post-fusion validation
//!   -> finders -> hotspot filter -> sort -> cap
//! ```
//!
//! Analyzer order is resolved once, at construction, so a slot collision or
//! dependency cycle surfaces before any store is touched. With validation
//! disabled the checkpoints are still evaluated at the end, but only
//! reported.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::analyzers::builtin_analyzers;
use super::base::{Analyzer, ErrorMode, Finder};
use super::finders::{builtin_finders, by_severity_desc};
use super::ordering::{resolve_analyzer_order, OrchestrationError};
use super::threshold::{compute_hotspot_median, is_hotspot};
use super::validation::{run_all_validations, validate_post_fusion, validate_post_scan, validate_post_structural};
use crate::config::AnalysisSettings;
use crate::error::ShannonResult;
use crate::events::ProgressBroadcaster;
use crate::models::{Finding, FindingScope};
use crate::signals::Tier;
use crate::store::{FactStore, SlotKind};

/// A component the kernel did not run to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedComponent {
    pub name: String,
    pub reason: String,
}

/// Outcome of one kernel run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightResult {
    /// Sorted by severity (desc) then identity key, capped.
    pub findings: Vec<Finding>,
    /// Findings before the cap was applied.
    pub total_before_cap: usize,
    pub analyzers_ran: Vec<String>,
    pub finders_ran: Vec<String>,
    pub skipped: Vec<SkippedComponent>,
    /// Normalization tier of the fused field, if fusion ran.
    pub tier: Option<Tier>,
    /// Contract violations reported without halting (validation disabled).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_messages: Vec<String>,
}

impl InsightResult {
    fn skip(&mut self, name: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedComponent {
            name: name.to_string(),
            reason: reason.into(),
        });
    }
}

pub struct InsightKernel {
    wave1: Vec<Box<dyn Analyzer>>,
    wave2: Vec<Box<dyn Analyzer>>,
    finders: Vec<Box<dyn Finder>>,
    settings: AnalysisSettings,
    progress: Option<Arc<ProgressBroadcaster>>,
}

impl InsightKernel {
    /// Kernel with every built-in analyzer and finder.
    pub fn new(settings: AnalysisSettings, repo: Option<PathBuf>) -> Result<Self, OrchestrationError> {
        let analyzers = builtin_analyzers(&settings, repo);
        Self::with_components(analyzers, builtin_finders(), settings)
    }

    pub fn with_components(
        analyzers: Vec<Box<dyn Analyzer>>,
        finders: Vec<Box<dyn Finder>>,
        settings: AnalysisSettings,
    ) -> Result<Self, OrchestrationError> {
        let (wave1, wave2) = resolve_analyzer_order(analyzers)?;
        Ok(Self {
            wave1,
            wave2,
            finders,
            settings,
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: Arc<ProgressBroadcaster>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Analyzer names in execution order.
    pub fn analyzer_order(&self) -> Vec<&'static str> {
        self.wave1.iter().chain(self.wave2.iter()).map(|a| a.name()).collect()
    }

    pub fn run(&self, store: &mut FactStore, max_findings: usize) -> ShannonResult<InsightResult> {
        let start = Instant::now();
        let validate = self.settings.enable_validation;
        let total_steps = self.wave1.len() + self.wave2.len() + self.finders.len();
        let mut step = 0usize;
        let mut result = InsightResult::default();

        if validate {
            validate_post_scan(store)?;
        }

        for analyzer in &self.wave1 {
            self.report("analyze", analyzer.name(), step, total_steps);
            self.run_analyzer(analyzer.as_ref(), store, &mut result)?;
            step += 1;
        }

        if validate {
            validate_post_structural(store)?;
        }

        for analyzer in &self.wave2 {
            self.report("fuse", analyzer.name(), step, total_steps);
            self.run_analyzer(analyzer.as_ref(), store, &mut result)?;
            step += 1;
        }

        if validate {
            validate_post_fusion(store)?;
        } else {
            result.validation_messages = run_all_validations(store);
        }

        result.tier = store.signal_field.get().map(|f| f.tier);
        let tier = result.tier.unwrap_or_default();

        let mut findings = Vec::new();
        for finder in &self.finders {
            self.report("find", finder.name(), step, total_steps);
            step += 1;
            findings.extend(self.run_finder(finder.as_ref(), store, tier, &mut result)?);
        }

        // identity keys computed once; sort comparisons would otherwise rehash
        let mut keyed: Vec<(String, Finding)> = findings.into_iter().map(|f| (f.identity_key(), f)).collect();
        keyed.sort_by(|(ka, a), (kb, b)| by_severity_desc(a, b).then_with(|| ka.cmp(kb)));

        result.total_before_cap = keyed.len();
        result.findings = keyed.into_iter().take(max_findings).map(|(_, f)| f).collect();

        self.report("done", "analysis complete", total_steps, total_steps);
        info!(
            findings = result.findings.len(),
            total = result.total_before_cap,
            skipped = result.skipped.len(),
            "Insight run finished in {:.2?}",
            start.elapsed()
        );
        Ok(result)
    }

    fn run_analyzer(&self, analyzer: &dyn Analyzer, store: &mut FactStore, result: &mut InsightResult) -> ShannonResult<()> {
        let name = analyzer.name();
        if let Some(missing) = analyzer.requires().iter().find(|s| !store.is_available(**s)) {
            debug!("Skipping analyzer {name}: slot '{missing}' unavailable");
            result.skip(name, format!("requires '{missing}'"));
            return Ok(());
        }

        let start = Instant::now();
        match analyzer.analyze(store) {
            Ok(()) => {
                debug!("Analyzer {name} finished in {:.2?}", start.elapsed());
                result.analyzers_ran.push(name.to_string());
                Ok(())
            }
            Err(err) => match analyzer.error_mode() {
                ErrorMode::Fail => Err(err.with_context("analyzer", name)),
                ErrorMode::Skip => {
                    warn!("Analyzer {name} failed, skipping: {err}");
                    result.skip(name, err.to_string());
                    Ok(())
                }
                ErrorMode::Degrade => {
                    warn!("Analyzer {name} failed, degrading: {err}");
                    for slot in analyzer.provides() {
                        if !store.is_available(*slot) {
                            store.set_slot_error(*slot, &err.message, name);
                        }
                    }
                    result.skip(name, err.to_string());
                    Ok(())
                }
            },
        }
    }

    fn run_finder(
        &self,
        finder: &dyn Finder,
        store: &FactStore,
        tier: Tier,
        result: &mut InsightResult,
    ) -> ShannonResult<Vec<Finding>> {
        let name = finder.name();
        if let Some(missing) = finder.requires().iter().find(|s| !store.is_available(**s)) {
            debug!("Skipping finder {name}: slot '{missing}' unavailable");
            result.skip(name, format!("requires '{missing}'"));
            return Ok(Vec::new());
        }
        if tier < finder.tier_minimum() {
            debug!("Skipping finder {name}: tier {} below {}", tier.as_str(), finder.tier_minimum().as_str());
            result.skip(name, format!("tier {} below {}", tier.as_str(), finder.tier_minimum().as_str()));
            return Ok(Vec::new());
        }

        let findings = match finder.find(store) {
            Ok(findings) => findings,
            Err(err) => match finder.error_mode() {
                ErrorMode::Fail => return Err(err.with_context("finder", name)),
                ErrorMode::Skip | ErrorMode::Degrade => {
                    warn!("Finder {name} failed: {err}");
                    result.skip(name, err.to_string());
                    return Ok(Vec::new());
                }
            },
        };
        result.finders_ran.push(name.to_string());

        if finder.hotspot_filtered() {
            Ok(hotspot_filter(store, findings))
        } else {
            Ok(findings)
        }
    }

    fn report(&self, phase: &str, message: &str, step: usize, total: usize) {
        if let Some(progress) = &self.progress {
            let percent = if total == 0 { 100.0 } else { step as f64 / total as f64 * 100.0 };
            progress.update(phase, message, percent);
        }
    }
}

/// Keeps file findings only for files changing more than the hotspot
/// median. A no-op without churn data.
fn hotspot_filter(store: &FactStore, findings: Vec<Finding>) -> Vec<Finding> {
    let (Some(field), true) = (store.signal_field.get(), store.is_available(SlotKind::Churn)) else {
        return findings;
    };
    let median = compute_hotspot_median(field);
    let before = findings.len();
    let kept: Vec<Finding> = findings
        .into_iter()
        .filter(|f| {
            f.scope != FindingScope::File
                || f.files.iter().all(|p| field.file(p).is_some_and(|fs| is_hotspot(fs, median)))
        })
        .collect();
    if kept.len() < before {
        debug!("Hotspot filter dropped {} findings (median {median})", before - kept.len());
    }
    kept
}
