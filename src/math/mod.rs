//! Mathematical primitives
//!
//! Leaf module with no dependencies on the rest of the engine:
//! - `entropy`: Shannon entropy, KL divergence, pooled entropy, mutual information
//! - `gini`: inequality coefficient
//! - `robust`: median/MAD/IQR outliers, modified z-scores
//! - `statistics`: mean/std, Grubbs' test, Mahalanobis, confidence intervals
//! - `centrality`: PageRank, betweenness, eigenvector, SCCs
//! - `community`: deterministic Louvain
//! - `compression`: compression ratio and normalized compression distance
//! - `identifier`: identifier tokenization, concept clusters, coherence
//!
//! Degenerate inputs (empty, zero variance, singular matrix) return normal
//! values. Only truly invalid input returns `MathError`.

pub mod centrality;
pub mod community;
pub mod compression;
pub mod entropy;
pub mod gini;
pub mod identifier;
pub mod robust;
pub mod statistics;

use crate::error::{ErrorCode, ShannonError};
use thiserror::Error;

/// Invalid input to a math primitive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("node index {0} out of bounds (graph has {1} nodes)")]
    NodeOutOfBounds(u32, u32),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("negative value {0} where non-negative input is required")]
    NegativeValue(f64),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("unknown compression algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("compression failed: {0}")]
    Compression(String),
}

pub type MathResult<T> = Result<T, MathError>;

impl From<MathError> for ShannonError {
    fn from(err: MathError) -> Self {
        let code = match &err {
            MathError::NodeOutOfBounds(..) => ErrorCode::SC301,
            MathError::Compression(_) | MathError::UnknownAlgorithm(_) => ErrorCode::SC302,
            _ => ErrorCode::SC603,
        };
        ShannonError::fatal(code, err.to_string())
    }
}
