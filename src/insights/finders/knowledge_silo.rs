use crate::error::ShannonResult;
use crate::insights::base::Finder;
use crate::insights::threshold::{compute_confidence, compute_hotspot_median, is_hotspot, Margin};
use crate::models::{Effort, Evidence, Finding};
use crate::signals::{FileSignals, Polarity, Signal, Tier};
use crate::store::FactStore;

const BUS_FACTOR_THRESHOLD: f64 = 1.5;
const PAGERANK_PCTL: f64 = 0.75;
const SEVERITY: f64 = 0.70;

/// Central files effectively owned by one person.
pub struct KnowledgeSiloFinder;

fn evaluate(fs: &FileSignals) -> Option<Finding> {
    if fs.bus_factor > BUS_FACTOR_THRESHOLD {
        return None;
    }
    let pr = fs.percentile(Signal::Pagerank).unwrap_or(0.0);
    if pr <= PAGERANK_PCTL {
        return None;
    }
    let confidence = compute_confidence(&[
        Margin::new(pr, PAGERANK_PCTL, Polarity::HighIsBad),
        Margin::new(fs.bus_factor, BUS_FACTOR_THRESHOLD, Polarity::HighIsGood),
    ]);

    Some(
        Finding::new(
            "knowledge_silo",
            SEVERITY,
            format!("Knowledge silo: {} (bus factor = {:.1})", fs.path, fs.bus_factor),
        )
        .with_files(vec![fs.path.clone()])
        .with_evidence(vec![
            Evidence::new(
                "bus_factor",
                fs.bus_factor,
                fs.percentile(Signal::BusFactor).unwrap_or(0.0),
                format!("Bus factor = {:.1} (single point of failure)", fs.bus_factor),
            ),
            Evidence::new(
                "pagerank",
                fs.pagerank,
                pr,
                format!("Top {:.0}% by centrality", (1.0 - pr) * 100.0),
            ),
            Evidence::new(
                "author_entropy",
                fs.author_entropy,
                0.0,
                format!("Author entropy = {:.2}", fs.author_entropy),
            ),
        ])
        .with_suggestion("Pair-program or rotate ownership. Single point of knowledge failure.")
        .with_confidence(confidence)
        .with_effort(Effort::Low),
    )
}

impl Finder for KnowledgeSiloFinder {
    fn name(&self) -> &'static str {
        "knowledge_silo"
    }

    fn description(&self) -> &'static str {
        "Central, actively changed files with a single effective author"
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Bayesian
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>> {
        let field = store.signal_field.value()?;
        // a solo project has bus factor 1 everywhere
        if field.tier == Tier::Absolute || field.global_signals.team_size <= 1 {
            return Ok(Vec::new());
        }
        let median = compute_hotspot_median(field);
        Ok(field
            .per_file
            .values()
            .filter(|fs| is_hotspot(fs, median))
            .filter_map(evaluate)
            .collect())
    }
}
