//! Error types for the article content core

use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The filesystem holding the work directory ran out of space
    #[error("Out of disk space while writing {path}")]
    DiskFull {
        /// File that could not be written
        path: PathBuf,
    },

    /// Part index outside the `1 ..= total_parts` range
    #[error("Invalid part layout: {part}/{total_parts}")]
    InvalidPart { part: u32, total_parts: u32 },

    /// A size argument that must be at least 1
    #[error("Invalid {field}: {value}")]
    InvalidSize { field: &'static str, value: u64 },

    /// Operation requires a non-empty payload
    #[error("Content is empty")]
    EmptyContent,

    /// The backing path is a directory, not a payload
    #[error("{path} is a directory")]
    IsDirectory {
        /// The offending path
        path: PathBuf,
    },

    /// Stream access before the content was opened
    #[error("Content stream is not open")]
    NotOpen,

    /// Group name with no valid characters left after normalization
    #[error("Invalid group: {0:?}")]
    InvalidGroup(String),
}

impl Error {
    /// Map a write failure to [`Error::DiskFull`] when the underlying cause
    /// is ENOSPC, otherwise wrap it as a plain IO error.
    pub(crate) fn from_write(err: std::io::Error, path: PathBuf) -> Self {
        if err.kind() == std::io::ErrorKind::StorageFull {
            Error::DiskFull { path }
        } else {
            Error::Io(err)
        }
    }
}
