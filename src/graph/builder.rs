//! Import resolution
//!
//! Import strings are matched against the scanned path set, in order:
//! 1. Python relative imports (`.base`, `..models`)
//! 2. path-relative imports (`./util`, `../lib/io`) with extension probing
//! 3. an exact scanned path
//! 4. a dotted module name (`pkg.models`, also without a leading `src.`)
//! 5. a dotted suffix shared by exactly one file
//!
//! Anything else is external (stdlib, third party) or phantom and is
//! recorded in `unresolved_imports`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::model::DependencyGraph;
use crate::models::FileMetrics;

/// Extensions tried for extension-less imports.
const SOURCE_EXTENSIONS: &[&str] = &["py", "ts", "tsx", "js", "jsx", "mjs", "go", "rs", "java", "rb"];

/// Files standing for their directory.
const PACKAGE_FILES: &[&str] = &["__init__", "index", "mod"];

/// Lookup tables over the scanned paths.
struct PathIndex<'a> {
    paths: BTreeSet<&'a str>,
    /// dotted module name -> path
    dotted: BTreeMap<String, &'a str>,
}

impl<'a> PathIndex<'a> {
    fn new(paths: impl Iterator<Item = &'a str>) -> Self {
        let paths: BTreeSet<&str> = paths.collect();
        let mut dotted = BTreeMap::new();
        for path in &paths {
            let name = dotted_name(path);
            if let Some(short) = name.strip_prefix("src.") {
                dotted.entry(short.to_string()).or_insert(*path);
            }
            dotted.entry(name).or_insert(*path);
        }
        Self { paths, dotted }
    }

    fn resolve(&self, import: &str, source: &str) -> Option<&'a str> {
        let import = import.trim();
        if import.is_empty() {
            return None;
        }
        if import.starts_with("./") || import.starts_with("../") {
            return self.resolve_path_relative(import, source);
        }
        if import.starts_with('.') {
            return self.resolve_python_relative(import, source);
        }
        if let Some(p) = self.paths.get(import) {
            return Some(*p);
        }

        let dotted = import.replace("::", ".").replace('/', ".");
        let dotted = dotted.trim_start_matches("crate.");
        if let Some(p) = self.dotted.get(dotted) {
            return Some(*p);
        }
        if let Some(p) = self.dotted.get(&format!("src.{dotted}")) {
            return Some(*p);
        }
        self.resolve_suffix(dotted)
    }

    fn resolve_python_relative(&self, import: &str, source: &str) -> Option<&'a str> {
        let dots = import.chars().take_while(|c| *c == '.').count();
        let module = &import[dots..];
        let mut dir = Path::new(source).parent().map(Path::to_path_buf).unwrap_or_default();
        // one dot is the current package
        for _ in 1..dots {
            dir = dir.parent().map(Path::to_path_buf).unwrap_or_default();
        }
        let base = if module.is_empty() {
            dir
        } else {
            dir.join(module.replace('.', "/"))
        };
        self.try_extensions(&base)
    }

    fn resolve_path_relative(&self, import: &str, source: &str) -> Option<&'a str> {
        let dir = Path::new(source).parent().unwrap_or_else(|| Path::new(""));
        let joined = normalize(&dir.join(import))?;
        self.try_extensions(&joined)
    }

    /// Tries `base` as a file, with each extension, and as a package directory.
    fn try_extensions(&self, base: &Path) -> Option<&'a str> {
        let base_str = to_key(base);
        if let Some(p) = self.paths.get(base_str.as_str()) {
            return Some(*p);
        }
        for ext in SOURCE_EXTENSIONS {
            if let Some(p) = self.paths.get(format!("{base_str}.{ext}").as_str()) {
                return Some(*p);
            }
        }
        for pkg in PACKAGE_FILES {
            for ext in SOURCE_EXTENSIONS {
                let candidate = to_key(&base.join(format!("{pkg}.{ext}")));
                if let Some(p) = self.paths.get(candidate.as_str()) {
                    return Some(*p);
                }
            }
        }
        None
    }

    fn resolve_suffix(&self, dotted: &str) -> Option<&'a str> {
        if dotted.is_empty() {
            return None;
        }
        let suffix = format!(".{dotted}");
        let mut matches = self
            .dotted
            .iter()
            .filter(|(name, _)| name.ends_with(&suffix))
            .map(|(_, path)| *path)
            .collect::<BTreeSet<_>>()
            .into_iter();
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

/// `src/pkg/models.py` -> `src.pkg.models`; package files name their directory.
fn dotted_name(path: &str) -> String {
    let p = Path::new(path);
    let stem = p.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let parent = p.parent().map(to_key).unwrap_or_default();
    let mut parts: Vec<&str> = parent.split('/').filter(|s| !s.is_empty()).collect();
    if !PACKAGE_FILES.contains(&stem.as_str()) || parts.is_empty() {
        parts.push(&stem);
    }
    parts.join(".")
}

fn to_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Lexically resolves `.` and `..`. None when the path climbs above the root.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

/// Builds the import graph from scanner records.
///
/// Self imports are ignored and repeated imports of the same file collapse
/// into one edge. Output depends only on the input contents.
pub fn build_dependency_graph(files: &[FileMetrics]) -> DependencyGraph {
    let mut graph = DependencyGraph::from_edges(files.iter().map(|f| f.path.clone()), &[] as &[(&str, &str)]);
    let index = PathIndex::new(files.iter().map(|f| f.path.as_str()));

    let mut sorted: Vec<&FileMetrics> = files.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    for file in sorted {
        for import in &file.imports {
            match index.resolve(import, &file.path) {
                Some(target) => {
                    graph.add_edge(&file.path, target);
                }
                None => graph
                    .unresolved_imports
                    .entry(file.path.clone())
                    .or_default()
                    .push(import.clone()),
            }
        }
    }

    debug!(
        "Built dependency graph: {} nodes, {} edges, {} unresolved imports",
        graph.node_count(),
        graph.edge_count,
        graph.unresolved_count()
    );
    graph
}

impl DependencyGraph {
    /// See [`build_dependency_graph`].
    pub fn build(files: &[FileMetrics]) -> Self {
        build_dependency_graph(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, imports: &[&str]) -> FileMetrics {
        FileMetrics {
            path: path.to_string(),
            imports: imports.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_python_relative_imports() {
        let files = vec![
            file("pkg/sub/a.py", &[".b", "..models", "..util.io"]),
            file("pkg/sub/b.py", &[]),
            file("pkg/models.py", &[]),
            file("pkg/util/io.py", &[]),
        ];
        let g = build_dependency_graph(&files);
        assert_eq!(
            g.imports("pkg/sub/a.py"),
            ["pkg/models.py".to_string(), "pkg/sub/b.py".to_string(), "pkg/util/io.py".to_string()]
        );
        assert!(g.unresolved_imports.is_empty());
    }

    #[test]
    fn test_dotted_and_src_prefix() {
        let files = vec![
            file("src/app/main.py", &["app.models", "src.app.db", "os", "requests"]),
            file("src/app/models.py", &[]),
            file("src/app/db/__init__.py", &[]),
        ];
        let g = build_dependency_graph(&files);
        assert_eq!(g.imports("src/app/main.py").len(), 2);
        assert!(g.imports("src/app/main.py").contains(&"src/app/db/__init__.py".to_string()));
        assert_eq!(g.unresolved_imports["src/app/main.py"], vec!["os", "requests"]);
    }

    #[test]
    fn test_path_relative_with_extension_lookup() {
        let files = vec![
            file("web/app.ts", &["./util", "../shared/index", "./missing"]),
            file("web/util.ts", &[]),
            file("shared/index.ts", &[]),
        ];
        let g = build_dependency_graph(&files);
        assert_eq!(g.imports("web/app.ts"), ["shared/index.ts".to_string(), "web/util.ts".to_string()]);
        assert_eq!(g.unresolved_imports["web/app.ts"], vec!["./missing"]);
    }

    #[test]
    fn test_self_import_and_duplicates_ignored() {
        let files = vec![file("a.py", &["a", "b", "b"]), file("b.py", &[])];
        let g = build_dependency_graph(&files);
        assert_eq!(g.edge_count, 1);
        assert_eq!(g.imports("a.py"), ["b.py".to_string()]);
        assert!(g.unresolved_imports.is_empty());
    }

    #[test]
    fn test_ambiguous_suffix_is_unresolved() {
        let files = vec![
            file("main.py", &["models"]),
            file("x/models.py", &[]),
            file("y/models.py", &[]),
        ];
        let g = build_dependency_graph(&files);
        assert_eq!(g.edge_count, 0);
        assert_eq!(g.unresolved_imports["main.py"], vec!["models"]);
    }

    #[test]
    fn test_build_is_order_independent() {
        let a = vec![file("a.py", &["b"]), file("b.py", &["c"]), file("c.py", &[])];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(build_dependency_graph(&a), build_dependency_graph(&b));
    }
}
