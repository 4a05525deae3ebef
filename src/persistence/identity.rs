//! Stable identity keys for findings
//!
//! A finding keeps its key across runs as long as the same issue is found
//! on the same target, whatever its severity does. Targets are canonical
//! per type:
//!
//! | types                                           | target                 |
//! |-------------------------------------------------|------------------------|
//! | single-file (high_risk_hub, god_file, ...)      | `files[0]`             |
//! | pairs (hidden_coupling, dead_dependency, clone) | sorted first two files |
//! | module pairs (layer_violation, conway_violation)| sorted first two paths |
//! | module (zone_of_pain, ...)                      | `files[0]`             |
//! | codebase (flat_architecture, ...)               | literal `codebase`     |
//! | anything else                                   | all files, sorted      |
//!
//! The key is the first 16 hex digits of SHA-256 over `type|target...`.

use sha2::{Digest, Sha256};

use crate::models::Finding;

const SINGLE_FILE_TYPES: &[&str] = &[
    "high_risk_hub",
    "god_file",
    "unstable_file",
    "orphan_code",
    "hollow_code",
    "phantom_imports",
    "naming_drift",
    "knowledge_silo",
    "review_blindspot",
    "weak_link",
    "bug_attractor",
];

const PAIR_TYPES: &[&str] = &["hidden_coupling", "dead_dependency", "copy_paste_clone", "accidental_coupling"];

const MODULE_PAIR_TYPES: &[&str] = &["layer_violation", "conway_violation"];

const MODULE_TYPES: &[&str] = &["boundary_mismatch", "zone_of_pain"];

const CODEBASE_TYPES: &[&str] = &["flat_architecture", "architecture_erosion"];

pub fn compute_identity_key(finding_type: &str, files: &[String]) -> String {
    let primary = || files.first().cloned().unwrap_or_default();

    let target: Vec<String> = if CODEBASE_TYPES.contains(&finding_type) {
        vec!["codebase".to_string()]
    } else if SINGLE_FILE_TYPES.contains(&finding_type) || MODULE_TYPES.contains(&finding_type) {
        vec![primary()]
    } else if PAIR_TYPES.contains(&finding_type) || MODULE_PAIR_TYPES.contains(&finding_type) {
        let mut pair: Vec<String> = files.iter().take(2).cloned().collect();
        pair.sort();
        pair
    } else {
        let mut all = files.to_vec();
        all.sort();
        all
    };

    let mut raw = String::from(finding_type);
    for part in &target {
        raw.push('|');
        raw.push_str(part);
    }
    let digest = Sha256::digest(raw.as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

pub fn finding_identity_key(finding: &Finding) -> String {
    compute_identity_key(&finding.finding_type, &finding.files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_pair_key_is_symmetric() {
        assert_eq!(
            compute_identity_key("hidden_coupling", &files(&["a", "b"])),
            compute_identity_key("hidden_coupling", &files(&["b", "a"]))
        );
    }

    #[test]
    fn test_single_file_key_uses_primary_only() {
        let k = compute_identity_key("high_risk_hub", &files(&["a", "b"]));
        assert_eq!(k, compute_identity_key("high_risk_hub", &files(&["a"])));
        assert_ne!(k, compute_identity_key("high_risk_hub", &files(&["b", "a"])));
        assert_eq!(k.len(), 16);
        assert!(k.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_matches_sha256_prefix() {
        // sha256("god_file|a.py")
        let full = format!("{:x}", Sha256::digest(b"god_file|a.py"));
        assert_eq!(compute_identity_key("god_file", &files(&["a.py"])), full[..16]);
    }

    #[test]
    fn test_codebase_and_unknown_types() {
        assert_eq!(
            compute_identity_key("flat_architecture", &files(&["x"])),
            compute_identity_key("flat_architecture", &[])
        );
        assert_eq!(
            compute_identity_key("mystery", &files(&["c", "a", "b"])),
            compute_identity_key("mystery", &files(&["a", "b", "c"]))
        );
        assert_ne!(
            compute_identity_key("god_file", &files(&["a"])),
            compute_identity_key("high_risk_hub", &files(&["a"]))
        );
    }

    #[test]
    fn test_module_findings_keyed_by_target() {
        let api_db = compute_identity_key("conway_violation", &files(&["api", "db"]));
        assert_eq!(api_db, compute_identity_key("conway_violation", &files(&["db", "api"])));
        assert_ne!(api_db, compute_identity_key("conway_violation", &files(&["api", "cli"])));
        assert_ne!(
            compute_identity_key("layer_violation", &files(&["db", "api"])),
            compute_identity_key("layer_violation", &files(&["db", "cli"]))
        );
        // moved-file suggestions do not change a mismatch's identity
        assert_eq!(
            compute_identity_key("boundary_mismatch", &files(&["util", "util/auth.py"])),
            compute_identity_key("boundary_mismatch", &files(&["util", "util/auth.py", "util/log.py"]))
        );
    }

    #[test]
    fn test_finding_key_follows_files() {
        let f = Finding::new("copy_paste_clone", 0.5, "t").with_files(files(&["z.py", "a.py"]));
        assert_eq!(finding_identity_key(&f), compute_identity_key("copy_paste_clone", &files(&["a.py", "z.py"])));
    }
}
