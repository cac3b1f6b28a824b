//! Errors raised at the engine's boundaries (config and dataset loading).
//!
//! The view transitions themselves never fail: bad input is clamped,
//! ignored, or treated as a non-matching filter.

use std::path::PathBuf;

use thiserror::Error;

use crate::row::RowId;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("duplicate row id `{0}`")]
    DuplicateRowId(RowId),

    #[error("row at position {position} has an empty id")]
    EmptyRowId { position: usize },

    #[error("no header row in {0}")]
    MissingHeader(PathBuf),
}

/// What a layout request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The request was applied after being forced into range.
    Clamped,
    /// The column doesn't allow this request, or doesn't exist.
    Ignored,
}

impl Outcome {
    pub fn is_ignored(self) -> bool {
        self == Outcome::Ignored
    }
}
