//! Error types for the operation log.
//!
//! Every fallible operation in this crate returns [`LogResult`]. Filesystem
//! failures keep the affected path and the underlying [`std::io::Error`] as
//! context; nothing is retried. A malformed log line is not an error (see
//! [`crate::store::LogStore::read_all`]).

use std::path::PathBuf;
use thiserror::Error;

/// Result type for all operation-log calls.
pub type LogResult<T> = Result<T, LogError>;

/// Failure modes of the operation log.
#[derive(Debug, Error)]
pub enum LogError {
    /// The user's home directory could not be determined and no environment
    /// fallback was available.
    #[error("home directory could not be determined")]
    HomeDirectoryUnavailable,

    /// Creating the log directory (or one of its parents) failed.
    #[error("failed to create log directory {path:?}")]
    DirectoryCreate {
        /// Directory that could not be created
        path: PathBuf,
        /// Source I/O error
        #[source]
        source: std::io::Error,
    },

    /// Opening the log file for append failed.
    #[error("failed to open log file {path:?}")]
    FileOpen {
        /// File that could not be opened
        path: PathBuf,
        /// Source I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing a serialized entry to the log file failed.
    #[error("failed to write log entry to {path:?}")]
    Write {
        /// File that could not be written
        path: PathBuf,
        /// Source I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading the log file failed for a reason other than the file not
    /// existing yet.
    #[error("failed to read log file {path:?}")]
    Read {
        /// File that could not be read
        path: PathBuf,
        /// Source I/O error
        #[source]
        source: std::io::Error,
    },
}

impl LogError {
    /// Helper for directory-creation failures.
    pub fn directory_create<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Helper for open failures on the log file.
    pub fn file_open<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::FileOpen {
            path: path.into(),
            source,
        }
    }

    /// Helper for write failures on the log file.
    pub fn write<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Helper for read failures on the log file.
    pub fn read<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
