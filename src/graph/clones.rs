//! Copy-paste clone detection by normalized compression distance
//!
//! Every sorted pair of non-trivial files is compared; pairs under the NCD
//! threshold are clones. Rows of the pair matrix run in parallel and are
//! collected in path order.

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use super::model::ClonePair;
use crate::math::compression::{raw_ncd, CompressionAlgorithm};
use crate::math::MathResult;
use crate::semantics::Role;

/// NCD below this marks a clone pair.
pub const CLONE_THRESHOLD: f64 = 0.30;

/// Files smaller than this many bytes are not compared.
pub const MIN_FILE_SIZE: usize = 10;

/// Both files sharing one of these roles are expected to look alike.
const BOILERPLATE_ROLES: &[Role] = &[Role::Test, Role::Migration];

fn skip_pair(a: &str, b: &str, roles: &BTreeMap<String, Role>) -> bool {
    match (roles.get(a), roles.get(b)) {
        (Some(ra), Some(rb)) => ra == rb && BOILERPLATE_ROLES.contains(ra),
        _ => false,
    }
}

/// Clone pairs with `file_a < file_b`, sorted.
pub fn detect_clones(
    contents: &BTreeMap<String, String>,
    roles: &BTreeMap<String, Role>,
    threshold: f64,
) -> MathResult<Vec<ClonePair>> {
    let files: Vec<(&str, &[u8])> = contents
        .iter()
        .filter(|(_, c)| c.len() >= MIN_FILE_SIZE)
        .map(|(p, c)| (p.as_str(), c.as_bytes()))
        .collect();
    if files.len() < 2 {
        return Ok(Vec::new());
    }

    let rows: Vec<Vec<ClonePair>> = (0..files.len())
        .into_par_iter()
        .map(|i| -> MathResult<Vec<ClonePair>> {
            let (path_a, content_a) = files[i];
            let mut row = Vec::new();
            for &(path_b, content_b) in &files[i + 1..] {
                if skip_pair(path_a, path_b, roles) {
                    continue;
                }
                let ncd = raw_ncd(content_a, content_b, CompressionAlgorithm::Zlib)?;
                if ncd < threshold {
                    row.push(ClonePair {
                        file_a: path_a.to_string(),
                        file_b: path_b.to_string(),
                        ncd,
                        size_a: content_a.len(),
                        size_b: content_b.len(),
                    });
                }
            }
            Ok(row)
        })
        .collect::<MathResult<_>>()?;

    Ok(rows.into_iter().flatten().collect())
}

/// Share of files that appear in at least one clone pair.
pub fn compute_clone_ratio(pairs: &[ClonePair], total_files: usize) -> f64 {
    if total_files == 0 {
        return 0.0;
    }
    let in_clones: BTreeSet<&str> = pairs
        .iter()
        .flat_map(|p| [p.file_a.as_str(), p.file_b.as_str()])
        .collect();
    in_clones.len() as f64 / total_files as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(seed: &str) -> String {
        (0..30)
            .map(|i| format!("def handler_{i}(request):\n    return render(request, '{seed}_{i}.html')\n"))
            .collect()
    }

    fn contents(items: &[(&str, String)]) -> BTreeMap<String, String> {
        items.iter().map(|(p, c)| (p.to_string(), c.clone())).collect()
    }

    #[test]
    fn test_identical_files_are_clones() {
        let c = contents(&[("a.py", body("x")), ("b.py", body("x"))]);
        let pairs = detect_clones(&c, &BTreeMap::new(), CLONE_THRESHOLD).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].file_a, "a.py");
        assert_eq!(pairs[0].file_b, "b.py");
        assert!(pairs[0].ncd < CLONE_THRESHOLD);
        assert_eq!(compute_clone_ratio(&pairs, 4), 0.5);
    }

    #[test]
    fn test_empty_and_tiny_files_skipped() {
        let c = contents(&[("a.py", String::new()), ("b.py", String::new()), ("c.py", "x=1".into())]);
        assert!(detect_clones(&c, &BTreeMap::new(), CLONE_THRESHOLD).unwrap().is_empty());
    }

    #[test]
    fn test_both_tests_skipped_but_mixed_flagged() {
        let c = contents(&[
            ("tests/test_a.py", body("x")),
            ("tests/test_b.py", body("x")),
            ("src/a.py", body("x")),
        ]);
        let roles: BTreeMap<String, Role> = [
            ("tests/test_a.py".to_string(), Role::Test),
            ("tests/test_b.py".to_string(), Role::Test),
            ("src/a.py".to_string(), Role::Service),
        ]
        .into_iter()
        .collect();
        let pairs = detect_clones(&c, &roles, CLONE_THRESHOLD).unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.file_a == "src/a.py"));
    }

    #[test]
    fn test_clone_ratio_empty() {
        assert_eq!(compute_clone_ratio(&[], 0), 0.0);
    }
}
