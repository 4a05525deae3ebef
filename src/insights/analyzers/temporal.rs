use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::AnalysisSettings;
use crate::error::ShannonResult;
use crate::graph::compute_author_distances;
use crate::insights::base::{Analyzer, ErrorMode};
use crate::store::{Entity, EntityId, FactStore, Relation, RelationType, SlotKind};
use crate::temporal::{build_churn_series, build_cochange_matrix, GitExtractor, GitHistory};

/// Churn series and co-change matrix from commit history.
///
/// History preloaded into the store wins; otherwise it is read from `repo`
/// under the configured timeout. Histories shorter than
/// `git_min_commits` are kept but produce no churn or co-change.
pub struct TemporalAnalyzer {
    repo: Option<PathBuf>,
    settings: AnalysisSettings,
}

impl TemporalAnalyzer {
    pub fn new(repo: Option<PathBuf>, settings: AnalysisSettings) -> Self {
        Self { repo, settings }
    }

    fn extract(&self) -> ShannonResult<Option<GitHistory>> {
        let Some(repo) = &self.repo else {
            debug!("No repository path, skipping git extraction");
            return Ok(None);
        };
        if !GitExtractor::is_git_repo(repo) {
            info!("{} is not a git repository, skipping temporal analysis", repo.display());
            return Ok(None);
        }
        let history = GitExtractor::new(repo)
            .with_max_commits(self.settings.git_max_commits)
            .with_timeout(Duration::from_secs(self.settings.git_timeout_secs))
            .extract()?;
        Ok(history)
    }
}

/// (file, author, commits) for every analyzed file.
fn authorship(history: &GitHistory, files: &BTreeSet<String>) -> Vec<(String, String, usize)> {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for commit in &history.commits {
        for file in commit.files.iter().filter(|f| files.contains(*f)) {
            *counts.entry((file.as_str(), commit.author.as_str())).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .map(|((f, a), n)| (f.to_string(), a.to_string(), n))
        .collect()
}

impl Analyzer for TemporalAnalyzer {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::FileMetrics]
    }

    fn provides(&self) -> &'static [SlotKind] {
        &[SlotKind::GitHistory, SlotKind::Churn, SlotKind::Cochange]
    }

    fn analyze(&self, store: &mut FactStore) -> ShannonResult<()> {
        if !store.git_history.is_available() {
            match self.extract()? {
                Some(history) => store.git_history.set(history, self.name()),
                None => return Ok(()),
            }
        }

        let history = store.git_history.value()?;
        if history.total_commits() < self.settings.git_min_commits {
            info!(
                "Only {} commits (minimum {}), skipping churn and co-change",
                history.total_commits(),
                self.settings.git_min_commits
            );
            return Ok(());
        }

        let files = store.file_set();
        let churn = build_churn_series(history, &files, self.settings.churn_window_weeks);
        let cochange = build_cochange_matrix(
            history,
            &files,
            self.settings.cochange_min_count,
            self.settings.cochange_max_files_per_commit,
        );
        let authored = authorship(history, &files);
        info!(
            "Temporal: {} commits, {} files with churn, {} co-change pairs",
            history.total_commits(),
            churn.len(),
            cochange.pairs.len()
        );

        let codebase = store.codebase_id();
        for (file, author, commits) in authored {
            let author_id = EntityId::author(author);
            if store.get_entity(&author_id).is_none() {
                store.add_entity(Entity::new(author_id.clone()).with_parent(codebase.clone()));
            }
            store.add_relation(
                Relation::new(EntityId::file(file), RelationType::AuthoredBy, author_id).with_weight(commits as f64),
            );
        }
        for pair in cochange.pairs.values() {
            store.add_relation(
                Relation::new(
                    EntityId::file(&pair.file_a),
                    RelationType::CochangesWith,
                    EntityId::file(&pair.file_b),
                )
                .with_weight(pair.lift),
            );
        }

        store.churn.set(churn, self.name());
        store.cochange.set(cochange, self.name());
        Ok(())
    }
}

/// Author-overlap distance between files.
pub struct AuthorDistanceAnalyzer;

impl Analyzer for AuthorDistanceAnalyzer {
    fn name(&self) -> &'static str {
        "author_distance"
    }

    fn requires(&self) -> &'static [SlotKind] {
        &[SlotKind::GitHistory]
    }

    fn provides(&self) -> &'static [SlotKind] {
        &[SlotKind::AuthorDistances]
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Skip
    }

    fn analyze(&self, store: &mut FactStore) -> ShannonResult<()> {
        let distances = compute_author_distances(store.git_history.value()?, &store.file_set());
        debug!("Computed {} author distances", distances.len());
        store.author_distances.set(distances, self.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileMetrics;
    use crate::temporal::Commit;

    fn store_with_history(n_commits: usize) -> FactStore {
        let mut store = FactStore::new(".");
        let metrics = ["a.py", "b.py", "c.py"]
            .iter()
            .map(|p| FileMetrics {
                path: p.to_string(),
                ..Default::default()
            })
            .collect();
        store.ingest_scan(metrics, BTreeMap::new(), BTreeMap::new());

        let commits = (0..n_commits)
            .map(|i| Commit {
                hash: format!("{i:040}"),
                timestamp: 1_700_000_000 - (i as i64) * 86_400,
                author: if i % 2 == 0 { "alice@x.io" } else { "bob@x.io" }.to_string(),
                files: vec!["a.py".to_string(), "b.py".to_string()],
                subject: "update".to_string(),
            })
            .collect();
        store.git_history.set(GitHistory::from_commits(commits), "test");
        store
    }

    #[test]
    fn test_preloaded_history_builds_churn_and_cochange() {
        let mut store = store_with_history(12);
        TemporalAnalyzer::new(None, AnalysisSettings::default()).analyze(&mut store).unwrap();

        let churn = store.churn.value().unwrap();
        assert_eq!(churn["a.py"].total_changes, 12);
        assert!(!churn.contains_key("c.py"));
        assert!(store.cochange.value().unwrap().pair("a.py", "b.py").is_some());
        assert!(store.has_relation(
            &EntityId::file("a.py"),
            RelationType::AuthoredBy,
            &EntityId::author("alice@x.io")
        ));
        assert!(store.get_entity(&EntityId::author("bob@x.io")).is_some());
        // preloaded history keeps its producer
        assert_eq!(store.git_history.producer(), Some("test"));
    }

    #[test]
    fn test_short_history_skips_churn() {
        let mut store = store_with_history(3);
        TemporalAnalyzer::new(None, AnalysisSettings::default()).analyze(&mut store).unwrap();
        assert!(store.git_history.is_available());
        assert!(!store.churn.is_available());
        assert!(!store.cochange.is_available());
    }

    #[test]
    fn test_no_repo_no_history() {
        let mut store = FactStore::new(".");
        TemporalAnalyzer::new(None, AnalysisSettings::default()).analyze(&mut store).unwrap();
        assert!(!store.git_history.is_available());

        let dir = tempfile::tempdir().unwrap();
        TemporalAnalyzer::new(Some(dir.path().to_path_buf()), AnalysisSettings::default())
            .analyze(&mut store)
            .unwrap();
        assert!(!store.git_history.is_available());
    }

    #[test]
    fn test_author_distances() {
        let mut store = store_with_history(4);
        AuthorDistanceAnalyzer.analyze(&mut store).unwrap();
        let d = store.author_distances.value().unwrap();
        assert_eq!(d.len(), 1);
        assert!(d[0].distance.abs() < 1e-9);
    }
}
