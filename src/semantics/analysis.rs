use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::roles::{classify_role, Role};
use crate::math::identifier::{
    cluster_entropy, compute_coherence, cosine_similarity, detect_semantic_clusters, extract_identifier_tokens,
    name_tokens,
};
use crate::models::FileSyntax;

/// Filenames that say nothing about their contents and never drift.
const GENERIC_FILENAMES: &[&str] = &[
    "utils", "util", "utilities", "helpers", "helper", "common", "misc", "shared", "base", "core", "__init__",
    "index", "main", "app", "config", "settings", "constants", "types", "models", "schemas", "exceptions",
    "errors", "mod", "lib",
];

/// Below this many content tokens naming drift is not measured.
const MIN_DRIFT_TOKENS: usize = 10;

fn todo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(TODO|FIXME|HACK|BUG)\b|\bXXX\b").expect("valid regex"))
}

/// One concept of a file: a stem group of its identifier vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub topic: String,
    pub keywords: Vec<String>,
    /// Share of the file's tokens in this concept.
    pub weight: f64,
}

/// Per-file semantic facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileSemantics {
    pub path: String,
    pub role: Role,
    pub concepts: Vec<Concept>,
    pub concept_count: usize,
    pub concept_entropy: f64,
    pub semantic_coherence: f64,
    pub naming_drift: f64,
    /// `None` when the file has nothing to document.
    pub docstring_coverage: Option<f64>,
    /// TODO-style markers per 100 lines.
    pub todo_density: f64,
}

/// TODO/FIXME/HACK/XXX/BUG markers per 100 lines.
pub fn todo_density(content: &str) -> f64 {
    if content.is_empty() {
        return 0.0;
    }
    let lines = content.matches('\n').count() + 1;
    todo_re().find_iter(content).count() as f64 / lines as f64 * 100.0
}

/// `1 − cosine(filename tokens, content tokens)`; 0 for generic names and
/// files too small to judge.
pub fn naming_drift(path: &str, content_tokens: &[String]) -> f64 {
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if GENERIC_FILENAMES.contains(&stem.as_str()) || content_tokens.len() < MIN_DRIFT_TOKENS {
        return 0.0;
    }
    let name = name_tokens(&stem);
    if name.is_empty() {
        return 0.0;
    }
    (1.0 - cosine_similarity(&name, content_tokens)).clamp(0.0, 1.0)
}

/// Semantics of one file from its syntax record and source text.
pub fn compute_file_semantics(syntax: &FileSyntax, content: &str) -> FileSemantics {
    let tokens = extract_identifier_tokens(content);
    let clusters = detect_semantic_clusters(&tokens, 3);
    let total = tokens.len().max(1) as f64;

    let concepts: Vec<Concept> = clusters
        .iter()
        .map(|c| Concept {
            topic: c.top_terms.first().cloned().unwrap_or_default(),
            keywords: c.tokens.clone(),
            weight: c.count as f64 / total,
        })
        .collect();

    FileSemantics {
        path: syntax.path.clone(),
        role: classify_role(syntax),
        concept_count: concepts.len(),
        concept_entropy: cluster_entropy(&clusters),
        semantic_coherence: compute_coherence(&tokens),
        naming_drift: naming_drift(&syntax.path, &tokens),
        docstring_coverage: syntax.docstring_coverage(),
        todo_density: todo_density(content),
        concepts,
    }
}

/// Semantics for every file with a syntax record. Missing contents count as
/// empty files.
pub fn analyze_semantics(
    syntax: &BTreeMap<String, FileSyntax>,
    contents: &BTreeMap<String, String>,
) -> BTreeMap<String, FileSemantics> {
    syntax
        .iter()
        .map(|(path, s)| {
            let content = contents.get(path).map(String::as_str).unwrap_or("");
            (path.clone(), compute_file_semantics(s, content))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_density() {
        assert_eq!(todo_density(""), 0.0);
        let content = "# TODO: x\ncode\n# fixme\ncode";
        assert!((todo_density(content) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_generic_name_never_drifts() {
        let tokens: Vec<String> = (0..20).map(|i| format!("render{i}")).collect();
        assert_eq!(naming_drift("src/utils.py", &tokens), 0.0);
    }

    #[test]
    fn test_naming_drift_matches_and_mismatches() {
        let about_users: Vec<String> = std::iter::repeat("user".to_string()).take(12).collect();
        assert!(naming_drift("src/user.py", &about_users) < 0.01);
        assert!((naming_drift("src/invoice.py", &about_users) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_file_semantics_populated() {
        let syntax = FileSyntax {
            path: "billing/invoice.py".into(),
            ..Default::default()
        };
        let content = "def compute_invoice_total(invoice):\n    return invoice.total_amount + invoice.tax_amount\n";
        let sem = compute_file_semantics(&syntax, content);
        assert!(sem.concept_count >= 1);
        assert!((0.0..=1.0).contains(&sem.semantic_coherence));
        assert_eq!(sem.docstring_coverage, None);
        assert_eq!(sem.role, Role::Unknown);
    }
}
