//! Temporal analysis over commit history
//!
//! - `models`: commits, history, churn series, co-change matrix
//! - `churn`: per-file change windows and trajectory
//! - `cochange`: files changing together
//! - `extractor`: git2 history reader with a timeout

pub mod churn;
pub mod cochange;
pub mod extractor;
pub mod models;

pub use churn::{build_churn_series, classify_trajectory};
pub use cochange::build_cochange_matrix;
pub use extractor::{GitExtractor, TemporalError};
pub use models::{ChurnSeries, CoChangeMatrix, CoChangePair, Commit, GitHistory, Trajectory};
