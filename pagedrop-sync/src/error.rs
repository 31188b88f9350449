//! Error types for pagedrop-sync.

use std::fmt;

use thiserror::Error;

use pagedrop_core::{Slug, ValidationError};
use pagedrop_store::StoreError;

use crate::writer::WriteResult;

/// All errors that can arise from publishing or patching.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Input rejected before touching the store.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The document to patch does not exist.
    #[error("{path} does not exist")]
    NotFound { path: String },

    /// Start/end markers absent or out of order. Never retried.
    #[error("section '{section}' not found in {path} (markers missing or out of order)")]
    SectionNotFound { path: String, section: String },

    /// The stored document is not text, so it cannot be spliced.
    #[error("{path} is not valid UTF-8 text")]
    NotUtf8 { path: String },

    /// Every attempt lost the compare-and-swap race.
    #[error("version conflict on {path} persisted after {attempts} attempts")]
    Conflict { path: String, attempts: u32 },

    /// A store failure other than a terminal conflict.
    #[error("store error at {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: StoreError,
    },

    /// One file of a batch failed; the files before it stay committed.
    #[error("{0}")]
    Batch(Box<BatchFailure>),

    /// The caller's deadline passed before the next write started.
    #[error("deadline exceeded for {slug}: {} file(s) committed, {remaining} not attempted", committed.len())]
    DeadlineExceeded {
        slug: Slug,
        committed: Vec<WriteResult>,
        remaining: usize,
    },

    /// README template failed to render.
    #[error("template error: {0}")]
    Render(#[from] tera::Error),
}

/// Where a batch stopped and what it had already committed.
#[derive(Debug)]
pub struct BatchFailure {
    pub slug: Slug,
    /// Zero-based position of the failing file in the unit.
    pub index: usize,
    pub path: String,
    pub committed: Vec<WriteResult>,
    pub source: PublishError,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "publishing {} failed at {} (file {}, {} already committed): {}",
            self.slug,
            self.path,
            self.index + 1,
            self.committed.len(),
            self.source
        )
    }
}

/// Stable classification of a [`PublishError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    SectionNotFound,
    Transport,
    Config,
    Decode,
    Deadline,
    Render,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::SectionNotFound => "section_not_found",
            ErrorKind::Transport => "transport",
            ErrorKind::Config => "config",
            ErrorKind::Decode => "decode",
            ErrorKind::Deadline => "deadline",
            ErrorKind::Render => "render",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublishError::Validation(_) => ErrorKind::Validation,
            PublishError::NotFound { .. } => ErrorKind::NotFound,
            PublishError::SectionNotFound { .. } => ErrorKind::SectionNotFound,
            PublishError::NotUtf8 { .. } => ErrorKind::Decode,
            PublishError::Conflict { .. } => ErrorKind::Conflict,
            PublishError::Store { source, .. } => match source {
                StoreError::Conflict { .. } => ErrorKind::Conflict,
                StoreError::Transport { .. } => ErrorKind::Transport,
                StoreError::Decode { .. } => ErrorKind::Decode,
                StoreError::Config(_) => ErrorKind::Config,
            },
            PublishError::Batch(failure) => failure.source.kind(),
            PublishError::DeadlineExceeded { .. } => ErrorKind::Deadline,
            PublishError::Render(_) => ErrorKind::Render,
        }
    }

    /// The failing batch, if this error came from one.
    pub fn batch_failure(&self) -> Option<&BatchFailure> {
        match self {
            PublishError::Batch(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Convenience constructor for [`PublishError::Store`].
pub(crate) fn store_err(path: impl Into<String>, source: StoreError) -> PublishError {
    PublishError::Store {
        path: path.into(),
        source,
    }
}
