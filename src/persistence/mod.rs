//! Snapshot persistence and diffing
//!
//! - `identity`: stable finding keys
//! - `models` / `capture`: the snapshot record and how a run becomes one
//! - `history`: append-only redb store with a baseline pointer and
//!   per-finding lifecycle
//! - `trends`: metric trends, top movers and persistent findings
//! - `diff`: identity-matched, rename-aware comparison of two snapshots
//! - `scope`: blast radius and risk of a set of changed files

pub mod capture;
pub mod diff;
pub mod history;
pub mod identity;
pub mod models;
pub mod scope;
pub mod trends;

pub use capture::capture_snapshot;
pub use diff::{classify_direction, diff_snapshots, Direction, FileDelta, FindingDelta, MetricDelta, SnapshotDiff};
pub use history::HistoryStore;
pub use identity::{compute_identity_key, finding_identity_key};
pub use models::{
    FindingLifecycle, FindingRecord, HealthPoint, LifecycleStatus, Mover, PersistentFinding, Snapshot,
    SnapshotSummary, TrendPoint,
};
pub use scope::{build_scoped_report, compute_blast_radius, ChangeScopedReport, RiskLevel};

use thiserror::Error;

use crate::error::{ErrorCode, ShannonError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("snapshot write failed: {0}")]
    Write(String),

    #[error("history store error: {0}")]
    Store(String),

    #[error("snapshot {id} is corrupt: {reason}")]
    Corrupt { id: u64, reason: String },

    #[error("snapshot {0} not found")]
    NotFound(u64),
}

impl From<PersistenceError> for ShannonError {
    fn from(err: PersistenceError) -> Self {
        let code = match &err {
            PersistenceError::Write(_) => ErrorCode::SC900,
            PersistenceError::Store(_) => ErrorCode::SC901,
            PersistenceError::Corrupt { .. } => ErrorCode::SC902,
            PersistenceError::NotFound(_) => ErrorCode::SC903,
        };
        let recoverable = matches!(err, PersistenceError::NotFound(_));
        ShannonError::new(code, err.to_string()).with_recoverable(recoverable)
    }
}
