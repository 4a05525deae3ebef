use tracing::info;

use crate::config::AnalysisSettings;
use crate::error::ShannonResult;
use crate::insights::base::{Analyzer, ErrorMode};
use crate::signals::{registry, FusionPipeline, Signal, SignalField, SignalType};
use crate::store::{EntityId, FactStore, SignalValue, SlotKind};

/// Runs the fusion pipeline over everything wave 1 produced and mirrors
/// the resulting field into the signal store.
pub struct SignalFusionAnalyzer {
    settings: AnalysisSettings,
}

impl SignalFusionAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }
}

fn typed(signal: Signal, v: f64) -> SignalValue {
    match registry().get(signal).map(|m| m.dtype) {
        Some(SignalType::Int) => SignalValue::Int(v as i64),
        Some(SignalType::Bool) => SignalValue::Bool(v != 0.0),
        _ => SignalValue::Float(v),
    }
}

fn numeric_values<F>(get: F) -> Vec<(Signal, SignalValue)>
where
    F: Fn(Signal) -> Option<f64>,
{
    Signal::ALL
        .iter()
        .filter_map(|s| get(*s).map(|v| (*s, typed(*s, v))))
        .collect()
}

fn write_field(store: &mut FactStore, field: &SignalField, producer: &str) {
    for (path, fs) in &field.per_file {
        let mut values = numeric_values(|s| fs.numeric(s));
        values.push((Signal::Role, SignalValue::from(fs.role.as_str())));
        values.push((Signal::ChurnTrajectory, SignalValue::from(fs.churn_trajectory.as_str())));
        store.write_signals(&EntityId::file(path), values, producer);
    }
    for (path, ms) in &field.per_module {
        store.write_signals(&EntityId::module(path), numeric_values(|s| ms.numeric(s)), producer);
    }
    let codebase = store.codebase_id();
    let global = &field.global_signals;
    store.write_signals(&codebase, numeric_values(|s| global.numeric(s)), producer);
}

impl Analyzer for SignalFusionAnalyzer {
    fn name(&self) -> &'static str {
        "fusion"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::FileMetrics]
    }

    fn provides(&self) -> &'static [SlotKind] {
        &[SlotKind::SignalField]
    }

    fn run_last(&self) -> bool {
        true
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Fail
    }

    fn analyze(&self, store: &mut FactStore) -> ShannonResult<()> {
        let field = FusionPipeline::new(store, &self.settings).run();
        info!(
            "Fused signals for {} files ({} tier), {} modules",
            field.file_count(),
            field.tier.as_str(),
            field.per_module.len()
        );
        write_field(store, &field, self.name());
        store.signal_field.set(field, self.name());
        Ok(())
    }
}
