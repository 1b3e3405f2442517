//! Crate error type
//!
//! Data problems found while scanning a document are *not* errors here: they
//! become [`ErrorRecord`](crate::diagnostics::ErrorRecord)s in a collector.
//! `Error` covers failures of the operation itself.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by indexing, editing, streaming and saving operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O failure on a specific path.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path that was being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// I/O failure on an anonymous stream.
    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),

    /// Patch offsets violate `start <= end`.
    #[error("invalid patch range [{start}, {end})")]
    InvalidRange {
        /// Requested start offset.
        start: u64,
        /// Requested end offset.
        end: u64,
    },

    /// An edit addressed bytes beyond the end of the document.
    #[error("offset {offset} is out of bounds (document length {len})")]
    OutOfBounds {
        /// Offending offset (or offset + length).
        offset: u64,
        /// Current logical length.
        len: u64,
    },

    /// The patch list handed to a virtual stream is unsorted, overlapping or
    /// extends past the file. This is an orchestration bug, not a data error.
    #[error("invalid patch set: {0}")]
    InvalidPatchSet(String),

    /// No unit with this id exists in the current index.
    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    /// A journal line could not be written.
    #[error("journal error on {path}: {message}")]
    Journal {
        /// Journal file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The configuration file is not valid TOML for [`Config`](crate::Config).
    #[error("invalid configuration in {path}: {source}")]
    Config {
        /// Configuration file.
        path: PathBuf,
        /// Parser error.
        source: toml::de::Error,
    },
}

impl Error {
    /// Wrap an `io::Error` with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
