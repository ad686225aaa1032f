//! # Error Types
//!
//! Every fallible engine operation returns [`SyncError`]. Two variants are
//! data-integrity violations that make continuing unsafe; the binary maps
//! them to a distinguished exit code. [`SyncError::InvalidPath`] is the only
//! variant the engine recovers from locally (the entry is skipped).

use std::path::PathBuf;
use thiserror::Error;

use crate::entity_cache::DimensionKind;

/// Result alias used across the engine
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// More than one dimension row carries the same name
    #[error("{count} {kind} rows are named {name:?}; refusing to pick one")]
    AmbiguousEntity {
        kind: DimensionKind,
        name: String,
        count: usize,
    },

    /// The reserved "unknown value" row does not exist
    #[error("sentinel {kind} row {:?} is missing from the catalog", crate::entity_cache::SENTINEL_NAME)]
    MissingSentinel { kind: DimensionKind },

    /// A path cannot be expressed relative to the archive root
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("catalog query failed: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("cannot read tags from {path:?}: {source}")]
    Tag {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },

    #[error("cannot stat {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl SyncError {
    pub(crate) fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SyncError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for the variants after which the catalog cannot be trusted to
    /// continue: an ambiguous dimension name or a missing sentinel row.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            SyncError::AmbiguousEntity { .. } | SyncError::MissingSentinel { .. }
        )
    }
}
