//! Append-only store over the on-disk log file.
//!
//! Writes add exactly one line at the end of the file; nothing is ever
//! rewritten or deleted. There is no locking and no cross-process
//! coordination: simultaneous appends from two processes rely on the
//! platform's append-mode guarantees, which hold for small single writes on
//! POSIX and Windows but are not universal. A reader racing a writer may see
//! a half-written final line; such a line fails to parse and is silently
//! dropped, which is the accepted outcome.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::entry::LogEntry;
use crate::errors::{LogError, LogResult};
use crate::paths::{self, Environment};

/// Environment variable that overrides the log file location when no
/// explicit path is given (ignored when set but empty).
pub const LOG_FILE_ENV: &str = "EGET_LOG_FILE";

/// Handle on one log file.
///
/// Construction never touches the filesystem; the directory and file are
/// created on the first [`append`](LogStore::append).
#[derive(Debug, Clone)]
pub struct LogStore {
    file_path: PathBuf,
}

impl LogStore {
    /// Binds a store to an explicit log file path.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Binds a store using the standard location precedence: the explicit
    /// override when given, else the `EGET_LOG_FILE` environment variable,
    /// else the platform default resolved from a fresh [`Environment`]
    /// snapshot.
    pub fn from_sources(path_override: Option<PathBuf>) -> LogResult<Self> {
        if let Some(path) = path_override {
            return Ok(Self::new(path));
        }
        if let Some(path) = std::env::var_os(LOG_FILE_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::new(PathBuf::from(path)));
        }
        let env = Environment::capture();
        Ok(Self::new(paths::log_file_path(&env)?))
    }

    /// The file this store reads and appends to.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Appends one entry to the log file, creating the directory and the
    /// file when missing.
    pub fn append(&self, entry: &LogEntry) -> LogResult<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LogError::directory_create(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .map_err(|e| LogError::file_open(&self.file_path, e))?;

        // The whole record goes out in a single write call.
        let line = format!("{entry}\n");
        file.write_all(line.as_bytes())
            .map_err(|e| LogError::write(&self.file_path, e))?;

        tracing::debug!(path = %self.file_path.display(), "appended log entry");
        Ok(())
    }

    /// Appends an entry stamped with the current UTC time.
    ///
    /// The written timestamp is not returned; hosts that need it build the
    /// entry themselves and call [`append`](LogStore::append).
    pub fn record(
        &self,
        repo: impl Into<String>,
        path: impl Into<String>,
        action: impl Into<String>,
    ) -> LogResult<()> {
        self.append(&LogEntry::new(repo, path, action))
    }

    /// Reads every well-formed entry, oldest first.
    ///
    /// A log file that does not exist yet reads as empty. Lines are trimmed
    /// and blank lines skipped; lines that do not parse are dropped without
    /// an error so that stale or half-written content never poisons a read.
    /// Bytes that are not valid UTF-8 decode to replacement characters
    /// instead of failing: only a real I/O error fails a read, content never
    /// does.
    pub fn read_all(&self) -> LogResult<Vec<LogEntry>> {
        let bytes = match fs::read(&self.file_path) {
            Ok(bytes) => bytes,
            // Never having logged anything is a normal state, not an error.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogError::read(&self.file_path, e)),
        };

        let mut entries = Vec::new();
        for raw in bytes.split(|b| *b == b'\n') {
            let line = String::from_utf8_lossy(raw);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(entry) = LogEntry::parse_line(line) {
                entries.push(entry);
            }
        }

        tracing::debug!(
            path = %self.file_path.display(),
            count = entries.len(),
            "read log entries"
        );
        Ok(entries)
    }

    /// Prints every entry to standard output, one display line each.
    ///
    /// Read errors propagate; there is no other failure mode.
    pub fn print_all(&self) -> LogResult<()> {
        for entry in self.read_all()? {
            println!("{entry}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ENV_MUTEX;
    use chrono::{TimeZone, Timelike, Utc};
    use std::env;
    use tempfile::tempdir;

    fn fixed_entry(repo: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            repo: repo.to_string(),
            path: format!("/usr/local/bin/{repo}"),
            action: "install".to_string(),
        }
    }

    #[test]
    fn round_trip_preserves_fields_at_second_precision() {
        let dir = tempdir().expect("tempdir");
        let store = LogStore::new(dir.path().join("eget.log"));

        let mut entry = fixed_entry("user/project");
        entry.timestamp = entry.timestamp + chrono::Duration::milliseconds(750);
        store.append(&entry).expect("append");

        let entries = store.read_all().expect("read");
        assert_eq!(entries.len(), 1);
        let back = &entries[0];
        assert_eq!(back.repo, entry.repo);
        assert_eq!(back.path, entry.path);
        assert_eq!(back.action, entry.action);
        assert_eq!(
            back.timestamp,
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn record_stamps_the_current_second() {
        let dir = tempdir().expect("tempdir");
        let store = LogStore::new(dir.path().join("eget.log"));

        let before = Utc::now().with_nanosecond(0).unwrap();
        store
            .record("foo/bar", "/tmp/bar", "remove")
            .expect("record");
        let after = Utc::now();

        let entries = store.read_all().expect("read");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].repo, "foo/bar");
        assert_eq!(entries[0].path, "/tmp/bar");
        assert_eq!(entries[0].action, "remove");
        assert!(entries[0].timestamp >= before);
        assert!(entries[0].timestamp <= after);
    }

    #[test]
    fn reads_preserve_append_order() {
        let dir = tempdir().expect("tempdir");
        let store = LogStore::new(dir.path().join("eget.log"));

        for repo in ["a/first", "b/second", "c/third"] {
            store.append(&fixed_entry(repo)).expect("append");
        }

        let repos: Vec<String> = store
            .read_all()
            .expect("read")
            .into_iter()
            .map(|e| e.repo)
            .collect();
        assert_eq!(repos, ["a/first", "b/second", "c/third"]);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().expect("tempdir");
        let store = LogStore::new(dir.path().join("never/written/eget.log"));
        assert!(store.read_all().expect("read").is_empty());
    }

    #[test]
    fn append_creates_missing_directories() {
        let dir = tempdir().expect("tempdir");
        let store = LogStore::new(dir.path().join("nested").join("logs").join("eget.log"));

        store.append(&fixed_entry("user/project")).expect("append");

        assert!(store.path().exists());
        assert_eq!(store.read_all().expect("read").len(), 1);
    }

    #[test]
    fn malformed_lines_are_silently_skipped() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("eget.log");
        fs::write(
            &path,
            "2024-06-01T12:00:00Z\tuser/project\t/usr/local/bin/project\tinstall\n\
             2024-06-01T12:00:01Z\tonly-two\n\
             2024-06-01T12:00:02Z\tb/second\t/tmp/second\tinstall\n",
        )
        .expect("write");

        let entries = LogStore::new(&path).read_all().expect("read");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].repo, "user/project");
        assert_eq!(entries[1].repo, "b/second");
    }

    #[test]
    fn bad_timestamps_are_silently_skipped() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("eget.log");
        fs::write(
            &path,
            "not-a-time\tuser/project\t/tmp/x\tinstall\n\
             2024-06-01T12:00:00Z\tb/second\t/tmp/second\tremove\n",
        )
        .expect("write");

        let entries = LogStore::new(&path).read_all().expect("read");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].repo, "b/second");
    }

    #[test]
    fn blank_and_whitespace_lines_are_skipped() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("eget.log");
        fs::write(
            &path,
            "\n  \n2024-06-01T12:00:00Z\tuser/project\t/tmp/x\tinstall\n\t\n",
        )
        .expect("write");

        let entries = LogStore::new(&path).read_all().expect("read");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn partial_trailing_line_is_dropped() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("eget.log");
        // A writer that died mid-record leaves an unterminated short line.
        fs::write(
            &path,
            "2024-06-01T12:00:00Z\tuser/project\t/tmp/x\tinstall\n2024-06-01T12:00:01Z\tb/sec",
        )
        .expect("write");

        let entries = LogStore::new(&path).read_all().expect("read");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].repo, "user/project");
    }

    #[test]
    fn invalid_utf8_bytes_never_fail_a_read() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("eget.log");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"2024-06-01T12:00:00Z\tuser/project\t/tmp/x\tinstall\n");
        bytes.extend_from_slice(b"2024-06-01T12:00:01Z\tuser\xff\xfeproject\t/tmp/y\tinstall\n");
        bytes.extend_from_slice(b"2024-06-01T12:00:02Z\tb/second\t/tmp/second\tremove\n");
        fs::write(&path, &bytes).expect("write");

        let entries = LogStore::new(&path).read_all().expect("read");
        // The damaged field decodes with replacement characters; the line is
        // still structurally valid and its neighbors are untouched.
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].repo, "user/project");
        assert!(entries[1].repo.contains('\u{FFFD}'));
        assert_eq!(entries[2].repo, "b/second");
    }

    #[test]
    fn line_torn_inside_a_multibyte_character_is_dropped() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("eget.log");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"2024-06-01T12:00:00Z\tuser/project\t/tmp/x\tinstall\n");
        // A torn final line can end halfway through a UTF-8 sequence.
        bytes.extend_from_slice(b"2024-06-01T12:00:01Z\tcaf\xc3");
        fs::write(&path, &bytes).expect("write");

        let entries = LogStore::new(&path).read_all().expect("read");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].repo, "user/project");
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_path_surfaces_a_read_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("eget.log");
        fs::create_dir(&path).expect("mkdir");

        let err = LogStore::new(&path).read_all().unwrap_err();
        assert!(matches!(err, LogError::Read { .. }));
    }

    #[test]
    fn from_sources_prefers_the_explicit_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let saved = env::var_os(LOG_FILE_ENV);
        env::set_var(LOG_FILE_ENV, "/elsewhere/env.log");

        let store =
            LogStore::from_sources(Some(PathBuf::from("/explicit/eget.log"))).expect("store");
        assert_eq!(store.path(), Path::new("/explicit/eget.log"));

        match saved {
            Some(value) => env::set_var(LOG_FILE_ENV, value),
            None => env::remove_var(LOG_FILE_ENV),
        }
    }

    #[test]
    fn from_sources_honors_the_environment_variable() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let saved = env::var_os(LOG_FILE_ENV);
        env::set_var(LOG_FILE_ENV, "/from-env/eget.log");

        let store = LogStore::from_sources(None).expect("store");
        assert_eq!(store.path(), Path::new("/from-env/eget.log"));

        match saved {
            Some(value) => env::set_var(LOG_FILE_ENV, value),
            None => env::remove_var(LOG_FILE_ENV),
        }
    }

    #[cfg(unix)]
    #[test]
    fn from_sources_falls_back_to_the_platform_default() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let saved_env = env::var_os(LOG_FILE_ENV);
        let saved_home = env::var_os("HOME");
        // An empty override variable counts as unset.
        env::set_var(LOG_FILE_ENV, "");
        env::set_var("HOME", "/home/fallback-test");

        let store = LogStore::from_sources(None).expect("store");
        assert_eq!(
            store.path(),
            Path::new("/home/fallback-test/.local/share/eget/logs/eget.log")
        );

        match saved_env {
            Some(value) => env::set_var(LOG_FILE_ENV, value),
            None => env::remove_var(LOG_FILE_ENV),
        }
        match saved_home {
            Some(value) => env::set_var("HOME", value),
            None => env::remove_var("HOME"),
        }
    }
}
