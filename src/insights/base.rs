//! Analyzer and finder traits
//!
//! Analyzers fill fact store slots; finders read the store and emit
//! findings. Both declare the slots they need so the kernel can order
//! analyzers and skip anything whose inputs are missing.

use serde::{Deserialize, Serialize};

use crate::error::ShannonResult;
use crate::models::{Finding, FindingScope};
use crate::signals::Tier;
use crate::store::{FactStore, SlotKind};

/// What the kernel does when a component fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Abort the run.
    Fail,
    /// Log and continue as if the component never ran.
    #[default]
    Skip,
    /// Record the error on the provided slots and continue.
    Degrade,
}

/// Populates one or more fact store slots.
///
/// # Example Implementation
///
/// ```ignore
/// struct RolesAnalyzer;
///
/// impl Analyzer for RolesAnalyzer {
///     fn name(&self) -> &'static str { "roles" }
///     fn requires(&self) -> &'static [SlotKind] { &[SlotKind::FileSyntax] }
///     fn provides(&self) -> &'static [SlotKind] { &[SlotKind::Roles] }
///
///     fn analyze(&self, store: &mut FactStore) -> ShannonResult<()> {
///         let roles = classify_all(store.file_syntax.value()?);
///         store.roles.set(roles, self.name());
///         Ok(())
///     }
/// }
/// ```
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Slots that must be populated before this analyzer runs.
    fn requires(&self) -> &'static [SlotKind];

    /// Slots this analyzer writes. No two analyzers may provide the same slot.
    fn provides(&self) -> &'static [SlotKind];

    /// Run in the second wave, after every regular analyzer.
    fn run_last(&self) -> bool {
        false
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Degrade
    }

    fn analyze(&self, store: &mut FactStore) -> ShannonResult<()>;
}

/// Turns store contents into findings. Receives the store read-only.
pub trait Finder: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::SignalField]
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Skip
    }

    /// Only report files that change more often than the hotspot median.
    fn hotspot_filtered(&self) -> bool {
        false
    }

    /// Lowest normalization tier at which this finder is meaningful.
    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn scope(&self) -> FindingScope {
        FindingScope::File
    }

    fn find(&self, store: &FactStore) -> ShannonResult<Vec<Finding>>;
}
