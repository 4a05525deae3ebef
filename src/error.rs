//! Error taxonomy for the analysis engine
//!
//! Every error raised by the engine carries:
//! - a structured `ErrorCode` (SC1xx..SC9xx) that maps to a subsystem category
//! - a human-readable message
//! - free-form context for structured logging
//! - a recoverability flag and an optional recovery hint
//!
//! Subsystem-specific errors (`MathError`, `ValidationError`, ...) convert into
//! `ShannonError` so the kernel can propagate a single type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Subsystem that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Scanning,
    Semantic,
    Graph,
    Temporal,
    Architecture,
    Signal,
    Finder,
    Validation,
    Persistence,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Scanning => "scanning",
            ErrorCategory::Semantic => "semantic",
            ErrorCategory::Graph => "graph",
            ErrorCategory::Temporal => "temporal",
            ErrorCategory::Architecture => "architecture",
            ErrorCategory::Signal => "signal",
            ErrorCategory::Finder => "finder",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Persistence => "persistence",
        };
        write!(f, "{name}")
    }
}

/// Structured error codes for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// File read error
    SC100,
    /// Encoding detection failed
    SC101,
    /// Syntax extraction failed
    SC102,
    /// Concept extraction failed
    SC200,
    /// Role classification ambiguous
    SC201,
    /// Import resolution failed
    SC300,
    /// Invalid graph input (bad index or parameter)
    SC301,
    /// Clone detection failed
    SC302,
    /// Graph has unreachable nodes
    SC303,
    /// Git repository not found
    SC400,
    /// Git history read failed
    SC401,
    /// Git read timed out
    SC402,
    /// Shallow clone detected
    SC403,
    /// Module detection failed
    SC500,
    /// Layer inference cycle detected
    SC501,
    /// Martin metrics undefined
    SC502,
    /// Percentile on non-percentileable signal
    SC600,
    /// Composite input missing
    SC601,
    /// Normalization tier mismatch
    SC602,
    /// Invalid numeric input to a math primitive
    SC603,
    /// Required signal unavailable
    SC700,
    /// Threshold evaluation failed
    SC701,
    /// Analyzer or finder execution failed
    SC702,
    /// Orchestration setup error (slot collision, dependency cycle)
    SC703,
    /// Phase contract violated
    SC800,
    /// Store slot missing or mismatched
    SC801,
    /// Adjacency/reverse inconsistent
    SC802,
    /// Snapshot write failed
    SC900,
    /// Store open or migration failed
    SC901,
    /// Snapshot corruption detected
    SC902,
    /// Snapshot not found
    SC903,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SC100 => "SC100",
            ErrorCode::SC101 => "SC101",
            ErrorCode::SC102 => "SC102",
            ErrorCode::SC200 => "SC200",
            ErrorCode::SC201 => "SC201",
            ErrorCode::SC300 => "SC300",
            ErrorCode::SC301 => "SC301",
            ErrorCode::SC302 => "SC302",
            ErrorCode::SC303 => "SC303",
            ErrorCode::SC400 => "SC400",
            ErrorCode::SC401 => "SC401",
            ErrorCode::SC402 => "SC402",
            ErrorCode::SC403 => "SC403",
            ErrorCode::SC500 => "SC500",
            ErrorCode::SC501 => "SC501",
            ErrorCode::SC502 => "SC502",
            ErrorCode::SC600 => "SC600",
            ErrorCode::SC601 => "SC601",
            ErrorCode::SC602 => "SC602",
            ErrorCode::SC603 => "SC603",
            ErrorCode::SC700 => "SC700",
            ErrorCode::SC701 => "SC701",
            ErrorCode::SC702 => "SC702",
            ErrorCode::SC703 => "SC703",
            ErrorCode::SC800 => "SC800",
            ErrorCode::SC801 => "SC801",
            ErrorCode::SC802 => "SC802",
            ErrorCode::SC900 => "SC900",
            ErrorCode::SC901 => "SC901",
            ErrorCode::SC902 => "SC902",
            ErrorCode::SC903 => "SC903",
        }
    }

    /// Category is the hundreds digit of the code.
    pub fn category(&self) -> ErrorCategory {
        match self.as_str().as_bytes()[2] {
            b'1' => ErrorCategory::Scanning,
            b'2' => ErrorCategory::Semantic,
            b'3' => ErrorCategory::Graph,
            b'4' => ErrorCategory::Temporal,
            b'5' => ErrorCategory::Architecture,
            b'6' => ErrorCategory::Signal,
            b'7' => ErrorCategory::Finder,
            b'8' => ErrorCategory::Validation,
            _ => ErrorCategory::Persistence,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base engine error with structured context.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("[{code}] {message}")]
pub struct ShannonError {
    pub code: ErrorCode,
    pub message: String,
    pub context: BTreeMap<String, String>,
    pub recoverable: bool,
    pub recovery_hint: Option<String>,
}

pub type ShannonResult<T> = Result<T, ShannonError>;

impl ShannonError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: BTreeMap::new(),
            recoverable: true,
            recovery_hint: None,
        }
    }

    /// Shorthand for a non-recoverable error.
    pub fn fatal(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message).with_recoverable(false)
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.recovery_hint = Some(hint.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Structured logging format.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error_code": self.code.as_str(),
            "category": self.category().to_string(),
            "message": self.message,
            "context": self.context,
            "recoverable": self.recoverable,
            "recovery_hint": self.recovery_hint,
        })
    }
}
