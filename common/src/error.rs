use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::RunKey;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal failures of a dataset build. Every variant names the path or field at fault.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration `{field}`: {reason}")]
    Configuration { field: &'static str, reason: String },
    #[error("could not parse {}: {detail}", path.display())]
    Parse { path: PathBuf, detail: String },
    #[error("label {label:?} is derived from both {} and {}", first.display(), second.display())]
    LabelCollision {
        label: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("grid cell [{key}] is produced by both {} and {}", first.display(), second.display())]
    GridCollision {
        key: RunKey,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single log row that had to be skipped. Counted and logged, never fatal on its own.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("expected at least {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("column `{column}` is not numeric: {value:?}")]
    NotNumeric { column: &'static str, value: String },
    #[error("unknown direction code {0:?}")]
    UnknownDirection(String),
    #[error("timestamp {timestamp} goes back from {previous}")]
    OutOfOrder { timestamp: u64, previous: u64 },
}
