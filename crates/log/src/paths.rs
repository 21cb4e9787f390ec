//! Platform-appropriate location of the log file.
//!
//! Resolution is a pure function of an [`Environment`] snapshot, so the rules
//! can be exercised in tests without mutating real process state.
//! [`Environment::capture`] is the only place ambient state is read, and no
//! function here performs any filesystem I/O or creates anything on disk.

use std::path::PathBuf;

use crate::errors::{LogError, LogResult};

const TOOL_DIR: &str = "eget";
const LOGS_DIR: &str = "logs";

/// File name of the operation log inside [`log_directory`].
pub const LOG_FILE_NAME: &str = "eget.log";

/// Snapshot of the process state that decides where the log lives.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Resolved home directory, if one could be determined.
    pub home: Option<PathBuf>,
    /// Value of `LOCALAPPDATA`, when set and non-empty (Windows placement).
    pub local_app_data: Option<PathBuf>,
}

impl Environment {
    /// Captures the ambient process state once.
    ///
    /// The home lookup goes through [`dirs::home_dir`], which understands
    /// both the POSIX `HOME` variable and the Windows user profile.
    pub fn capture() -> Self {
        Self {
            home: dirs::home_dir(),
            local_app_data: std::env::var_os("LOCALAPPDATA")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Returns the directory that holds the log file, without creating it.
///
/// Windows places the log under the local application data directory
/// (`%LOCALAPPDATA%`, falling back to `<home>\AppData\Local`); everything
/// else uses `<home>/.local/share`. Both variants append `eget/logs` and
/// fail with [`LogError::HomeDirectoryUnavailable`] when they would need a
/// home directory that could not be resolved.
pub fn log_directory(env: &Environment) -> LogResult<PathBuf> {
    #[cfg(windows)]
    {
        let base = match &env.local_app_data {
            Some(dir) => dir.clone(),
            None => env
                .home
                .as_ref()
                .ok_or(LogError::HomeDirectoryUnavailable)?
                .join("AppData")
                .join("Local"),
        };
        Ok(base.join(TOOL_DIR).join(LOGS_DIR))
    }

    #[cfg(not(windows))]
    {
        let home = env
            .home
            .as_ref()
            .ok_or(LogError::HomeDirectoryUnavailable)?;
        Ok(home
            .join(".local")
            .join("share")
            .join(TOOL_DIR)
            .join(LOGS_DIR))
    }
}

/// Returns the full path of the log file, without creating anything.
pub fn log_file_path(env: &Environment) -> LogResult<PathBuf> {
    Ok(log_directory(env)?.join(LOG_FILE_NAME))
}
