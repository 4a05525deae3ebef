//! Core data models for Shannon Insight
//!
//! Two groups live here:
//! - input records produced by the scanner collaborator (`FileMetrics`,
//!   `FileSyntax` and its parts), deserialized from a fact bundle
//! - the `Finding` emitted by finders, with its evidence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::math::gini::gini_of_counts;

// ============================================================================
// SCANNER RECORDS
// ============================================================================

/// Per-file size and shape metrics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FileMetrics {
    pub path: String,
    pub lines: usize,
    pub tokens: usize,
    /// Raw import strings as written in the source.
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub functions: usize,
    pub interfaces: usize,
    pub structs: usize,
    /// Mean cyclomatic complexity per function.
    pub complexity_score: f64,
    pub nesting_depth: usize,
    pub function_sizes: Vec<usize>,
}

/// A function or method definition.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body_tokens: usize,
    pub signature_tokens: usize,
    pub nesting_depth: usize,
    pub start_line: usize,
    pub end_line: usize,
    /// `None` when the scanner could not resolve calls syntactically.
    pub call_targets: Option<Vec<String>>,
    pub decorators: Vec<String>,
    pub has_docstring: bool,
}

impl FunctionDef {
    /// Empty or trivial body (`pass`, `...`).
    pub fn is_stub(&self) -> bool {
        self.body_tokens < 3
    }

    /// 1.0 for an empty body, 0.0 for concise one-liners, otherwise how far
    /// the body falls short of the signature.
    pub fn stub_score(&self) -> f64 {
        if self.body_tokens < 3 {
            return 1.0;
        }
        if self.body_tokens < 10 || self.signature_tokens == 0 {
            return 0.0;
        }
        let ratio = self.body_tokens as f64 / self.signature_tokens as f64;
        (1.0 - ratio).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<String>,
    pub methods: Vec<FunctionDef>,
    pub fields: Vec<String>,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ImportDecl {
    pub source: String,
    pub names: Vec<String>,
    /// `None` means the import does not resolve to a scanned file.
    pub resolved_path: Option<String>,
}

impl ImportDecl {
    pub fn is_phantom(&self) -> bool {
        self.resolved_path.is_none()
    }
}

/// Full syntax extraction for one file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FileSyntax {
    pub path: String,
    pub functions: Vec<FunctionDef>,
    pub classes: Vec<ClassDef>,
    pub imports: Vec<ImportDecl>,
    pub language: String,
    pub has_main_guard: bool,
}

impl FileSyntax {
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn max_nesting(&self) -> usize {
        self.functions.iter().map(|f| f.nesting_depth).max().unwrap_or(0)
    }

    /// Mean stub score across functions, 0 without functions.
    pub fn stub_ratio(&self) -> f64 {
        if self.functions.is_empty() {
            return 0.0;
        }
        self.functions.iter().map(FunctionDef::stub_score).sum::<f64>() / self.functions.len() as f64
    }

    /// Gini of function body sizes.
    pub fn impl_gini(&self) -> f64 {
        if self.functions.len() <= 1 {
            return 0.0;
        }
        let sizes: Vec<usize> = self.functions.iter().map(|f| f.body_tokens).collect();
        gini_of_counts(&sizes, false)
    }

    /// Share of functions and classes carrying a docstring.
    pub fn docstring_coverage(&self) -> Option<f64> {
        let total = self.functions.len() + self.classes.len();
        if total == 0 {
            return None;
        }
        let documented = self.functions.iter().filter(|f| f.has_docstring).count()
            + self
                .classes
                .iter()
                .filter(|c| c.methods.iter().any(|m| m.has_docstring))
                .count();
        Some(documented as f64 / total as f64)
    }

    /// Every decorator name on functions and methods.
    pub fn decorators(&self) -> impl Iterator<Item = &str> {
        self.functions
            .iter()
            .chain(self.classes.iter().flat_map(|c| c.methods.iter()))
            .flat_map(|f| f.decorators.iter().map(String::as_str))
    }
}

/// Parent directory of a path-keyed file ("." for top-level files).
pub fn parent_dir(path: &str) -> String {
    match Path::new(path).parent().map(|p| p.to_string_lossy().to_string()) {
        Some(p) if !p.is_empty() => p,
        _ => ".".to_string(),
    }
}

// ============================================================================
// FINDINGS
// ============================================================================

/// Implementation effort to address a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Effort {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effort::Low => write!(f, "LOW"),
            Effort::Medium => write!(f, "MEDIUM"),
            Effort::High => write!(f, "HIGH"),
        }
    }
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingScope {
    #[default]
    File,
    FilePair,
    Module,
    ModulePair,
    Codebase,
}

/// One piece of quantitative support for a finding.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Evidence {
    pub signal: String,
    pub value: f64,
    /// Percentile rank in `[0, 1]`; 0 when the tier has no percentiles.
    pub percentile: f64,
    pub description: String,
}

impl Evidence {
    pub fn new(signal: impl Into<String>, value: f64, percentile: f64, description: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
            value,
            percentile,
            description: description.into(),
        }
    }
}

/// A concrete pattern match.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Finding {
    pub finding_type: String,
    /// In `[0, 1]`.
    pub severity: f64,
    pub title: String,
    /// Target entities; pairs are stored in discovery order.
    pub files: Vec<String>,
    pub evidence: Vec<Evidence>,
    pub suggestion: String,
    /// In `[0, 1]`.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub effort: Effort,
    #[serde(default)]
    pub scope: FindingScope,
    /// Free-form extra data keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

fn default_confidence() -> f64 {
    1.0
}

impl Finding {
    pub fn new(finding_type: impl Into<String>, severity: f64, title: impl Into<String>) -> Self {
        Self {
            finding_type: finding_type.into(),
            severity: severity.clamp(0.0, 1.0),
            title: title.into(),
            confidence: 1.0,
            ..Default::default()
        }
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    pub fn with_evidence(mut self, evidence: Vec<Evidence>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = effort;
        self
    }

    pub fn with_scope(mut self, scope: FindingScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Identity key tying this finding across snapshots.
    pub fn identity_key(&self) -> String {
        crate::persistence::identity::finding_identity_key(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(body: usize, sig: usize) -> FunctionDef {
        FunctionDef {
            name: "f".into(),
            body_tokens: body,
            signature_tokens: sig,
            ..Default::default()
        }
    }

    #[test]
    fn test_stub_score_thresholds() {
        assert_eq!(func(0, 5).stub_score(), 1.0);
        assert_eq!(func(5, 5).stub_score(), 0.0);
        assert_eq!(func(40, 10).stub_score(), 0.0);
        assert!((func(10, 20).stub_score() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_syntax_aggregates() {
        let syntax = FileSyntax {
            path: "a.py".into(),
            functions: vec![func(0, 4), func(50, 5)],
            ..Default::default()
        };
        assert_eq!(syntax.function_count(), 2);
        assert!((syntax.stub_ratio() - 0.5).abs() < 1e-12);
        assert!(syntax.impl_gini() > 0.0);
        assert_eq!(syntax.docstring_coverage(), Some(0.0));
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("src/app/models.py"), "src/app");
        assert_eq!(parent_dir("setup.py"), ".");
    }

    #[test]
    fn test_finding_builder_clamps() {
        let f = Finding::new("god_file", 1.7, "x").with_confidence(-0.2);
        assert_eq!(f.severity, 1.0);
        assert_eq!(f.confidence, 0.0);
    }

    #[test]
    fn test_effort_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Effort::High).unwrap(), "\"HIGH\"");
    }
}
