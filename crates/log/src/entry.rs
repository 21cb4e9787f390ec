//! The log record type and its line format.
//!
//! One entry serializes to one tab-separated line:
//!
//! ```text
//! <RFC3339-timestamp>\t<repo>\t<path>\t<action>\n
//! ```
//!
//! The trailing newline belongs to the on-disk record and is added by the
//! writer; the [`Display`](std::fmt::Display) form carries no newline.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One recorded action.
///
/// Fields must not contain tab or newline characters; those are the field
/// and record delimiters and no escaping is performed. Callers are
/// responsible for keeping them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the action happened (UTC; serialized at second precision)
    pub timestamp: DateTime<Utc>,
    /// Identifier of the source repository or asset
    pub repo: String,
    /// Filesystem path where the action's result was placed
    pub path: String,
    /// Short free-form description, e.g. "install" or "remove"
    pub action: String,
}

impl LogEntry {
    /// Builds an entry stamped with the current UTC time.
    pub fn new(
        repo: impl Into<String>,
        path: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            repo: repo.into(),
            path: path.into(),
            action: action.into(),
        }
    }

    /// Parses one log line (already trimmed) back into an entry.
    ///
    /// Returns `None` for anything that does not split into exactly four
    /// tab-separated fields with a valid RFC 3339 first field. Callers skip
    /// such lines; a partially written or hand-damaged line must never abort
    /// a read of the surrounding file.
    pub fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            return None;
        }
        let timestamp = DateTime::parse_from_rfc3339(fields[0])
            .ok()?
            .with_timezone(&Utc);
        Some(Self {
            timestamp,
            repo: fields[1].to_string(),
            path: fields[2].to_string(),
            action: fields[3].to_string(),
        })
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.repo,
            self.path,
            self.action
        )
    }
}
