//! Error types for reading and querying DE ephemeris files
//!
//! Opening a file and querying it fail in different ways, so each phase has
//! its own error enum. An `OpenError` means no `Ephemeris` was ever built.
//! A `QueryError` refers to a single request against a live `Ephemeris`.

use std::path::PathBuf;

use thiserror::Error;

use crate::names::Item;

/// Failure while opening and validating an ephemeris file
#[derive(Error, Debug)]
pub enum OpenError {
    /// Reading or seeking the file failed
    #[error("File I/O error on {path:?}: {source}")]
    Io {
        /// The path of the file that caused the error
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The header or the block layout is internally inconsistent
    #[error("Corrupt ephemeris file: {0}")]
    Corrupt(String),
}

/// Failure of a single query against an open ephemeris
#[derive(Error, Debug)]
pub enum QueryError {
    /// An earlier I/O failure left this instance unusable
    #[error("Ephemeris is not ready: an earlier read of the file failed")]
    NotReady,

    /// The requested date is outside the covered interval
    #[error("Date {jed} is outside ephemeris range ({begin_jed}..{end_jed})")]
    OutOfRange {
        /// The Julian Ephemeris Date that was requested
        jed: f64,
        /// First covered date
        begin_jed: f64,
        /// Last covered date
        end_jed: f64,
    },

    /// A body code, item index or coefficient offset is not valid
    #[error("Invalid {kind} index: {index}")]
    InvalidIndex {
        /// What kind of index was rejected
        kind: &'static str,
        /// The rejected value
        index: i64,
    },

    /// The item is not stored in this release
    #[error("{0} is not available in this ephemeris release")]
    Unavailable(Item),

    /// Reading a coefficient block failed
    #[error("File I/O error on {path:?}: {source}")]
    Io {
        /// The path of the file that caused the error
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },
}

/// Result of opening an ephemeris file
pub type OpenResult<T> = std::result::Result<T, OpenError>;

/// Result of a query against an open ephemeris
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Attach a file path to an I/O error raised while opening
pub fn io_err(path: impl Into<PathBuf>, err: std::io::Error) -> OpenError {
    OpenError::Io {
        path: path.into(),
        source: err,
    }
}

/// Shorthand for a consistency failure
pub fn corrupt(reason: impl Into<String>) -> OpenError {
    OpenError::Corrupt(reason.into())
}
