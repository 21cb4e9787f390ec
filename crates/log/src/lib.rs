//! # eget operation log
//!
//! Append-only record of what the `eget` binary fetcher installed, removed,
//! or otherwise did to the machine. Each action becomes one tab-separated
//! line in a per-user log file:
//!
//! ```text
//! 2024-06-01T12:00:00Z\tuser/project\t/usr/local/bin/project\tinstall
//! ```
//!
//! The file lives under `%LOCALAPPDATA%\eget\logs` on Windows and
//! `~/.local/share/eget/logs` elsewhere; see [`paths`]. [`store::LogStore`]
//! appends and reads entries, tolerating malformed lines by dropping them.
//! There is no cross-process locking; see the [`store`] module docs for the
//! exact guarantees.

pub mod entry;
pub mod errors;
pub mod paths;
pub mod store;

// Re-export the working set for convenience
pub use entry::LogEntry;
pub use errors::{LogError, LogResult};
pub use paths::{log_directory, log_file_path, Environment};
pub use store::{LogStore, LOG_FILE_ENV};
