use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorCode, ShannonError, ShannonResult};

/// Names of the typed analysis slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    FileMetrics,
    FileSyntax,
    FileContents,
    Structural,
    GitHistory,
    Churn,
    Cochange,
    Semantics,
    Roles,
    Spectral,
    ClonePairs,
    AuthorDistances,
    Architecture,
    SignalField,
}

impl SlotKind {
    pub const ALL: [SlotKind; 14] = [
        SlotKind::FileMetrics,
        SlotKind::FileSyntax,
        SlotKind::FileContents,
        SlotKind::Structural,
        SlotKind::GitHistory,
        SlotKind::Churn,
        SlotKind::Cochange,
        SlotKind::Semantics,
        SlotKind::Roles,
        SlotKind::Spectral,
        SlotKind::ClonePairs,
        SlotKind::AuthorDistances,
        SlotKind::Architecture,
        SlotKind::SignalField,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::FileMetrics => "file_metrics",
            SlotKind::FileSyntax => "file_syntax",
            SlotKind::FileContents => "file_contents",
            SlotKind::Structural => "structural",
            SlotKind::GitHistory => "git_history",
            SlotKind::Churn => "churn",
            SlotKind::Cochange => "cochange",
            SlotKind::Semantics => "semantics",
            SlotKind::Roles => "roles",
            SlotKind::Spectral => "spectral",
            SlotKind::ClonePairs => "clone_pairs",
            SlotKind::AuthorDistances => "author_distances",
            SlotKind::Architecture => "architecture",
            SlotKind::SignalField => "signal_field",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed result cell: empty, filled, or failed. Records who wrote it.
#[derive(Debug, Clone)]
pub struct Slot<T> {
    kind: SlotKind,
    value: Option<T>,
    error: Option<String>,
    producer: Option<String>,
}

impl<T> Slot<T> {
    pub fn new(kind: SlotKind) -> Self {
        Self {
            kind,
            value: None,
            error: None,
            producer: None,
        }
    }

    pub fn set(&mut self, value: T, producer: &str) {
        self.value = Some(value);
        self.error = None;
        self.producer = Some(producer.to_string());
    }

    /// Marks the slot failed. A previously stored value is dropped.
    pub fn set_error(&mut self, error: impl Into<String>, producer: &str) {
        self.value = None;
        self.error = Some(error.into());
        self.producer = Some(producer.to_string());
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The value, or SC801 naming the slot and any recorded failure.
    pub fn value(&self) -> ShannonResult<&T> {
        self.value.as_ref().ok_or_else(|| {
            let mut err = ShannonError::new(ErrorCode::SC801, format!("slot '{}' is not populated", self.kind));
            if let Some(e) = &self.error {
                err = err.with_context("error", e);
            }
            if let Some(p) = &self.producer {
                err = err.with_context("producer", p);
            }
            err
        })
    }

    pub fn is_available(&self) -> bool {
        self.value.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn producer(&self) -> Option<&str> {
        self.producer.as_deref()
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }
}
