//! Analyze and scope commands
//!
//! Both read a facts bundle written by the scanner:
//!
//! ```json
//! {
//!   "root": "/path/to/repo",
//!   "files":    [ FileMetrics, ... ],
//!   "syntax":   { "path": FileSyntax, ... },
//!   "contents": { "path": "source text", ... },
//!   "commits":  [ Commit, ... ]
//! }
//! ```
//!
//! Everything except `files` is optional. Commits in the bundle take
//! precedence over reading the repository's git history.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use shannon_insight::config::load_settings;
use shannon_insight::events::ProgressBroadcaster;
use shannon_insight::insights::{InsightKernel, InsightResult};
use shannon_insight::models::{FileMetrics, FileSyntax};
use shannon_insight::persistence::{build_scoped_report, capture_snapshot, HistoryStore};
use shannon_insight::temporal::{Commit, GitHistory};
use shannon_insight::{AnalysisSettings, FactStore};

use super::print_json;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FactsBundle {
    root: Option<String>,
    files: Vec<FileMetrics>,
    syntax: BTreeMap<String, FileSyntax>,
    contents: BTreeMap<String, String>,
    commits: Vec<Commit>,
}

fn load_bundle(path: &Path) -> Result<FactsBundle> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read facts bundle {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid facts bundle {}", path.display()))
}

fn build_store(repo: &Path, bundle: FactsBundle) -> FactStore {
    let root = bundle.root.unwrap_or_else(|| repo.display().to_string());
    let mut store = FactStore::new(root);
    store.ingest_scan(bundle.files, bundle.syntax, bundle.contents);
    if !bundle.commits.is_empty() {
        store.git_history.set(GitHistory::from_commits(bundle.commits), "scanner");
    }
    store
}

/// Runs the kernel over `facts`; returns the populated store and result.
fn analyze_facts(
    repo: &Path,
    facts: &Path,
    settings: &AnalysisSettings,
    max_findings: usize,
    no_git: bool,
    progress: Option<Arc<ProgressBroadcaster>>,
) -> Result<(FactStore, InsightResult)> {
    let mut store = build_store(repo, load_bundle(facts)?);
    let git_repo: Option<PathBuf> = (!no_git).then(|| repo.to_path_buf());

    let mut kernel = InsightKernel::new(settings.clone(), git_repo)?;
    if let Some(p) = progress {
        kernel = kernel.with_progress(p);
    }
    let result = kernel.run(&mut store, max_findings)?;
    Ok((store, result))
}

#[derive(Serialize)]
struct AnalyzeOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_id: Option<u64>,
    #[serde(flatten)]
    result: InsightResult,
}

pub(super) fn run(
    repo: &Path,
    facts: &Path,
    save: bool,
    max_findings: Option<usize>,
    no_git: bool,
    progress: bool,
) -> Result<()> {
    let settings = load_settings(repo)?;
    settings.validate()?;
    let cap = max_findings.unwrap_or(settings.insights_max_findings);

    let broadcaster = progress.then(|| Arc::new(ProgressBroadcaster::new()));
    let printer = broadcaster.as_ref().map(|b| {
        let (_, rx) = b.subscribe();
        thread::spawn(move || {
            for state in rx {
                eprintln!("[{:>5.1}%] {}: {}", state.percent, state.phase, state.message);
            }
        })
    });

    let outcome = analyze_facts(repo, facts, &settings, cap, no_git, broadcaster.clone());
    // the printer exits once every sender is gone
    drop(broadcaster);
    if let Some(handle) = printer {
        let _ = handle.join();
    }
    let (store, result) = outcome?;

    let snapshot_id = if save && settings.enable_history {
        let snapshot = capture_snapshot(&store, &result, &settings);
        let history = HistoryStore::open(&HistoryStore::default_path(repo))?;
        let id = history.save(&snapshot)?;
        info!("Snapshot {id} written to {}", history.path().display());
        Some(id)
    } else {
        None
    };

    print_json(&AnalyzeOutput { snapshot_id, result })
}

pub(super) fn scope(repo: &Path, facts: &Path, changed: Vec<String>, no_git: bool) -> Result<()> {
    let settings = load_settings(repo)?;
    settings.validate()?;
    let (store, result) = analyze_facts(repo, facts, &settings, usize::MAX, no_git, None)?;
    let snapshot = capture_snapshot(&store, &result, &settings);
    print_json(&build_scoped_report(&changed, &snapshot))
}
