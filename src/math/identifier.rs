//! Identifier tokens and vocabulary coherence
//!
//! Identifiers are split into words (`validateEmailAddress` → `validate`,
//! `email`, `address`) and grouped into rough concept clusters. A file whose
//! vocabulary falls into one cluster is focused; many balanced clusters mean
//! mixed responsibilities.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use super::entropy;

/// Keywords and generic words across the supported languages.
const STOP_WORDS: &[&str] = &[
    // python
    "def", "class", "import", "from", "return", "elif", "for", "while", "with", "try", "except",
    "finally", "raise", "pass", "break", "continue", "and", "not", "lambda", "yield", "async",
    "await", "global", "nonlocal", "assert", "del", "true", "false", "none", "self",
    // go
    "func", "var", "const", "type", "struct", "interface", "package", "range", "chan", "select",
    "defer", "recover", "make", "new", "append", "copy", "len", "cap", "close", "nil",
    // typescript / javascript
    "function", "let", "switch", "case", "throw", "catch", "super", "extends", "enum", "export",
    "default", "undefined", "this",
    // rust
    "impl", "trait", "match", "loop", "pub", "mod", "crate", "where", "unsafe", "extern",
    // java
    "public", "private", "protected", "static", "final", "void", "abstract", "implements",
    "throws", "synchronized",
    // ruby
    "require", "include", "extend", "module", "begin", "rescue", "ensure", "elsif", "unless",
    "until", "attr",
    // c / c++
    "define", "ifdef", "ifndef", "endif", "typedef", "sizeof", "template", "namespace", "using",
    "virtual", "inline", "volatile", "register",
    // generic
    "get", "set", "the", "else", "null", "int", "str", "bool", "float", "string", "err", "error",
];

fn stop_words() -> &'static BTreeSet<&'static str> {
    static SET: OnceLock<BTreeSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_]\w{2,}").expect("valid regex"))
}

fn acronym_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid regex"))
}

fn camel_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z])([A-Z])").expect("valid regex"))
}

/// Splits one identifier into lowercase words, keeping stop words and short
/// fragments. `XMLParser` → `xml`, `parser`.
pub fn split_identifier(ident: &str) -> Vec<String> {
    let spaced = acronym_re().replace_all(ident, "${1} ${2}");
    let spaced = camel_re().replace_all(&spaced, "${1} ${2}");
    spaced
        .replace('_', " ")
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect()
}

fn keep_token(word: &str) -> bool {
    word.chars().count() >= 3
        && !word.chars().all(|c| c.is_ascii_digit())
        && !stop_words().contains(word)
}

/// All semantic tokens of a source text, in order of appearance.
pub fn extract_identifier_tokens(content: &str) -> Vec<String> {
    identifier_re()
        .find_iter(content)
        .flat_map(|m| split_identifier(m.as_str()))
        .filter(|w| keep_token(w))
        .collect()
}

/// Tokens of a bare name such as a file stem.
pub fn name_tokens(name: &str) -> Vec<String> {
    split_identifier(name).into_iter().filter(|w| keep_token(w)).collect()
}

/// A group of tokens sharing a stem.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenCluster {
    pub tokens: Vec<String>,
    /// Up to three most frequent members.
    pub top_terms: Vec<String>,
    /// Total occurrences of the members.
    pub count: usize,
}

fn token_counts(tokens: &[String]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    counts
}

fn top_terms(members: &[&str], counts: &BTreeMap<&str, usize>) -> Vec<String> {
    let mut ranked: Vec<&str> = members.to_vec();
    // stable sort keeps alphabetical order among equal counts
    ranked.sort_by(|a, b| counts[b].cmp(&counts[a]));
    ranked.into_iter().take(3).map(str::to_string).collect()
}

/// Groups tokens by their first three characters.
///
/// Fewer than three distinct tokens form a single cluster. Stem groups whose
/// total weight is below `min_cluster_size` are dropped; if nothing survives
/// all tokens form one cluster.
pub fn detect_semantic_clusters(tokens: &[String], min_cluster_size: usize) -> Vec<TokenCluster> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let counts = token_counts(tokens);
    let unique: Vec<&str> = counts.keys().copied().collect();

    if unique.len() < 3 {
        return vec![TokenCluster {
            tokens: unique.iter().map(|t| t.to_string()).collect(),
            top_terms: top_terms(&unique, &counts),
            count: tokens.len(),
        }];
    }

    let mut by_stem: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for token in &unique {
        let stem: String = token.chars().take(3).collect();
        by_stem.entry(stem).or_default().push(*token);
    }

    let clusters: Vec<TokenCluster> = by_stem
        .values()
        .filter_map(|members| {
            let count: usize = members.iter().map(|t| counts[t]).sum();
            (count >= min_cluster_size).then(|| TokenCluster {
                tokens: members.iter().map(|t| t.to_string()).collect(),
                top_terms: top_terms(members, &counts),
                count,
            })
        })
        .collect();

    if clusters.is_empty() {
        return vec![TokenCluster {
            tokens: unique.iter().map(|t| t.to_string()).collect(),
            top_terms: top_terms(&unique, &counts),
            count: tokens.len(),
        }];
    }
    clusters
}

/// Coherence in `[0, 1]`: `1 − H(cluster shares) / log₂(k)`.
///
/// No tokens → 0.0, a single cluster → 1.0.
pub fn compute_coherence(tokens: &[String]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let clusters = detect_semantic_clusters(tokens, 3);
    if clusters.len() <= 1 {
        return 1.0;
    }
    let total = tokens.len() as f64;
    let h: f64 = clusters
        .iter()
        .map(|c| c.count as f64 / total)
        .filter(|p| *p > 0.0)
        .map(|p| -p * p.log2())
        .sum();
    let max_h = (clusters.len() as f64).log2();
    (1.0 - h / max_h).clamp(0.0, 1.0)
}

/// Entropy (bits) of the cluster size distribution.
pub fn cluster_entropy(clusters: &[TokenCluster]) -> f64 {
    entropy::shannon_counts(clusters.iter().map(|c| c.count as f64))
}

/// Cosine similarity of two token bags. 0.0 when either is empty.
pub fn cosine_similarity(a: &[String], b: &[String]) -> f64 {
    let ca = token_counts(a);
    let cb = token_counts(b);
    if ca.is_empty() || cb.is_empty() {
        return 0.0;
    }
    let dot: f64 = ca
        .iter()
        .filter_map(|(t, x)| cb.get(t).map(|y| (*x * *y) as f64))
        .sum();
    let norm_a = ca.values().map(|x| (x * x) as f64).sum::<f64>().sqrt();
    let norm_b = cb.values().map(|x| (x * x) as f64).sum::<f64>().sqrt();
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_split_camel_snake_acronym() {
        assert_eq!(split_identifier("validateEmailAddress"), toks(&["validate", "email", "address"]));
        assert_eq!(split_identifier("_transform_upper"), toks(&["transform", "upper"]));
        assert_eq!(split_identifier("XMLParser"), toks(&["xml", "parser"]));
    }

    #[test]
    fn test_extract_filters_stop_words_short_and_numeric() {
        let tokens = extract_identifier_tokens("def load_user(self, id_123):\n    return self.fetch_user_by_id()");
        assert!(tokens.contains(&"load".to_string()));
        assert!(tokens.contains(&"user".to_string()));
        assert!(tokens.contains(&"fetch".to_string()));
        assert!(!tokens.iter().any(|t| t == "def" || t == "self" || t == "id" || t == "123"));
    }

    #[test]
    fn test_coherence_empty_is_zero() {
        assert_eq!(compute_coherence(&[]), 0.0);
    }

    #[test]
    fn test_coherence_single_cluster_is_one() {
        let tokens = toks(&["parse", "parser", "parsing", "parse", "parser"]);
        assert_eq!(compute_coherence(&tokens), 1.0);
    }

    #[test]
    fn test_coherence_mixed_is_lower() {
        let focused = toks(&["parse", "parser", "parsed", "parse", "parser", "parsing"]);
        let mixed = toks(&[
            "parse", "parser", "parse", "render", "renderer", "render", "storage", "store", "stored",
            "email", "emails", "email",
        ]);
        assert!(compute_coherence(&mixed) < compute_coherence(&focused));
    }

    #[test]
    fn test_cosine_similarity() {
        let a = toks(&["user", "account"]);
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&a, &toks(&["render"])), 0.0);
        assert_eq!(cosine_similarity(&a, &[]), 0.0);
    }

    #[test]
    fn test_clusters_fall_back_to_single() {
        let tokens = toks(&["alpha", "bravo", "charlie"]);
        let clusters = detect_semantic_clusters(&tokens, 3);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count, 3);
    }
}
