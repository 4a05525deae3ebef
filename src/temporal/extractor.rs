//! Git history extraction using libgit2
//!
//! The revwalk runs on a worker thread; the caller waits on a channel with a
//! timeout so a huge or wedged repository can never hang the pipeline. On
//! timeout the worker is abandoned and its result discarded.

use crossbeam_channel::{bounded, RecvTimeoutError};
use git2::{ErrorCode as GitErrorCode, Repository, Sort};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::models::{Commit, GitHistory};
use crate::error::{ErrorCode, ShannonError};

/// Failure reading commit history.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemporalError {
    #[error("not a git repository: {0}")]
    NotARepository(String),

    #[error("git history read timed out after {0}s")]
    Timeout(u64),

    #[error("git error: {0}")]
    Git(String),
}

impl TemporalError {
    /// Timeouts may succeed on a later attempt; a missing repository never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TemporalError::Timeout(_))
    }
}

impl From<git2::Error> for TemporalError {
    fn from(err: git2::Error) -> Self {
        TemporalError::Git(err.message().to_string())
    }
}

impl From<TemporalError> for ShannonError {
    fn from(err: TemporalError) -> Self {
        let code = match &err {
            TemporalError::NotARepository(_) => ErrorCode::SC400,
            TemporalError::Timeout(_) => ErrorCode::SC402,
            TemporalError::Git(_) => ErrorCode::SC401,
        };
        let retryable = err.is_retryable();
        let shannon = ShannonError::new(code, err.to_string()).with_recoverable(retryable);
        if retryable {
            shannon.with_hint("raise git_timeout_secs or lower git_max_commits")
        } else {
            shannon
        }
    }
}

/// Reads commit history from the repository containing `repo_path`.
#[derive(Debug, Clone)]
pub struct GitExtractor {
    repo_path: PathBuf,
    max_commits: usize,
    timeout: Duration,
}

impl GitExtractor {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            max_commits: 5000,
            timeout: Duration::from_secs(30),
        }
    }

    /// 0 means no limit.
    pub fn with_max_commits(mut self, max_commits: usize) -> Self {
        self.max_commits = max_commits;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if a path is inside a git repository.
    pub fn is_git_repo(path: &Path) -> bool {
        Repository::discover(path).is_ok()
    }

    /// Commit history, newest first. `Ok(None)` for a repository without
    /// commits.
    pub fn extract(&self) -> Result<Option<GitHistory>, TemporalError> {
        let (tx, rx) = bounded(1);
        let path = self.repo_path.clone();
        let max_commits = self.max_commits;

        thread::Builder::new()
            .name("git-history".to_string())
            .spawn(move || {
                // the receiver may be gone after a timeout
                let _ = tx.send(read_history(&path, max_commits));
            })
            .map_err(|e| TemporalError::Git(format!("failed to spawn git worker: {e}")))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!("Git history read exceeded {}s, skipping temporal analysis", self.timeout.as_secs());
                Err(TemporalError::Timeout(self.timeout.as_secs()))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TemporalError::Git("git worker exited without a result".to_string())),
        }
    }
}

fn read_history(path: &Path, max_commits: usize) -> Result<Option<GitHistory>, TemporalError> {
    let repo = Repository::discover(path).map_err(|_| TemporalError::NotARepository(path.display().to_string()))?;
    debug!("Opened git repository at {:?}", repo.path());

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    match revwalk.push_head() {
        Ok(()) => {}
        Err(e) if matches!(e.code(), GitErrorCode::UnbornBranch | GitErrorCode::NotFound) => {
            info!("Repository has no commits, skipping temporal analysis");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let mut commits = Vec::new();
    for oid_result in revwalk {
        if max_commits > 0 && commits.len() >= max_commits {
            break;
        }
        let commit = repo.find_commit(oid_result?)?;

        let parent = commit.parent(0).ok();
        let tree = commit.tree()?;
        let parent_tree = parent.as_ref().map(|p| p.tree()).transpose()?;
        let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

        let mut files = Vec::new();
        diff.foreach(
            &mut |delta, _| {
                if let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) {
                    files.push(path.to_string_lossy().replace('\\', "/"));
                }
                true
            },
            None,
            None,
            None,
        )?;
        // merges without their own changes say nothing about files
        if files.is_empty() {
            continue;
        }

        let author = commit.author();
        commits.push(Commit {
            hash: commit.id().to_string(),
            timestamp: commit.time().seconds(),
            author: author
                .email()
                .filter(|e| !e.is_empty())
                .or_else(|| author.name())
                .unwrap_or("unknown")
                .to_string(),
            files,
            subject: commit.summary().unwrap_or("").to_string(),
        });
    }

    if commits.is_empty() {
        return Ok(None);
    }
    debug!("Read {} commits from git history", commits.len());
    Ok(Some(GitHistory::from_commits(commits)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn commit_file(repo: &Repository, dir: &Path, name: &str, content: &str, message: &str) {
        std::fs::write(dir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = repo.signature().unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs).unwrap();
    }

    fn init_repo(dir: &Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        repo
    }

    #[test]
    fn test_extracts_commits_newest_first() {
        let dir = tempdir().unwrap();
        let repo = init_repo(dir.path());
        commit_file(&repo, dir.path(), "a.py", "x = 1\n", "Initial commit");
        commit_file(&repo, dir.path(), "b.py", "y = 2\n", "Fix typo in b");

        let history = GitExtractor::new(dir.path()).extract().unwrap().unwrap();
        assert_eq!(history.total_commits(), 2);
        assert_eq!(history.commits[0].subject, "Fix typo in b");
        assert_eq!(history.commits[0].files, vec!["b.py"]);
        assert_eq!(history.commits[1].files, vec!["a.py"]);
        assert_eq!(history.commits[0].author, "test@example.com");
        assert!(history.file_set.contains("a.py"));
    }

    #[test]
    fn test_max_commits_limits_walk() {
        let dir = tempdir().unwrap();
        let repo = init_repo(dir.path());
        commit_file(&repo, dir.path(), "a.py", "1", "one");
        commit_file(&repo, dir.path(), "a.py", "2", "two");
        commit_file(&repo, dir.path(), "a.py", "3", "three");

        let history = GitExtractor::new(dir.path()).with_max_commits(2).extract().unwrap().unwrap();
        assert_eq!(history.total_commits(), 2);
    }

    #[test]
    fn test_not_a_repository_is_not_retryable() {
        let dir = tempdir().unwrap();
        let err = GitExtractor::new(dir.path().join("missing")).extract().unwrap_err();
        assert!(matches!(err, TemporalError::NotARepository(_)));
        assert!(!err.is_retryable());
        let shannon: ShannonError = err.into();
        assert_eq!(shannon.code, ErrorCode::SC400);
        assert!(!shannon.recoverable);
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = TemporalError::Timeout(30);
        assert!(err.is_retryable());
        let shannon: ShannonError = err.into();
        assert_eq!(shannon.code, ErrorCode::SC402);
        assert!(shannon.recoverable);
        assert!(shannon.recovery_hint.is_some());
    }

    #[test]
    fn test_empty_repository_has_no_history() {
        let dir = tempdir().unwrap();
        init_repo(dir.path());
        assert_eq!(GitExtractor::new(dir.path()).extract().unwrap(), None);
    }
}
