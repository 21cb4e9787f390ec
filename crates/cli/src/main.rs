// # -----------------------------
// # crates/cli/src/main.rs
// # -----------------------------
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use eget_log::{LogEntry, LogStore};

#[derive(Parser, Debug)]
#[command(
    name = "eget-log",
    version,
    about = "Operation log for the eget binary fetcher",
    long_about = None
)]
struct Cli {
    /// Log file to operate on. Overrides EGET_LOG_FILE and the platform default.
    #[arg(long = "log-file", global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error, off). Overrides RUST_LOG if set.
    #[arg(long = "log-level", global = true, value_name = "LEVEL")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append one entry, stamped with the current UTC time.
    ///
    /// Fields must not contain tab or line-break characters; the log format
    /// uses them as delimiters and performs no escaping.
    Record {
        /// Source repository or asset identifier (e.g. user/project)
        repo: String,
        /// Filesystem path the action touched
        path: String,
        /// What happened (e.g. install, remove)
        action: String,
    },

    /// Print recorded entries, oldest first.
    ///
    /// A log file that does not exist yet lists as empty; damaged lines are
    /// skipped rather than reported.
    List {
        /// Emit one JSON object per entry instead of the tab-separated form
        #[arg(long)]
        json: bool,
        /// Keep entries whose repo or path contains this text (case-insensitive)
        #[arg(long, value_name = "TEXT")]
        filter: Option<String>,
    },

    /// Print the resolved log file location
    Path {
        /// Print the log directory instead of the file
        #[arg(long)]
        dir: bool,
    },
}

/// Initialize logging based on CLI arguments and environment
fn init_logging(log_level: Option<&str>) -> Result<()> {
    // CLI arg overrides RUST_LOG; default stays quiet.
    let filter = if let Some(level) = log_level {
        match level.to_lowercase().as_str() {
            "off" => EnvFilter::new("off"),
            "error" => EnvFilter::new("error"),
            "warn" | "warning" => EnvFilter::new("warn"),
            "info" => EnvFilter::new("info"),
            "debug" => EnvFilter::new("debug"),
            "trace" => EnvFilter::new("trace"),
            _ => {
                eprintln!("Warning: invalid log level '{}', using 'info'", level);
                EnvFilter::new("info")
            }
        }
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Record { repo, path, action } => {
            cmd_record(cli.log_file, &repo, &path, &action)
        }
        Commands::List { json, filter } => cmd_list(cli.log_file, json, filter),
        Commands::Path { dir } => cmd_path(cli.log_file, dir),
    }
}

fn cmd_record(log_file: Option<PathBuf>, repo: &str, path: &str, action: &str) -> Result<()> {
    ensure_plain_field("repo", repo)?;
    ensure_plain_field("path", path)?;
    ensure_plain_field("action", action)?;

    let store = LogStore::from_sources(log_file).context("resolve log file location")?;
    store
        .record(repo, path, action)
        .context("append log entry")?;
    tracing::info!(repo, path, action, "recorded operation");
    Ok(())
}

fn cmd_list(log_file: Option<PathBuf>, json: bool, filter: Option<String>) -> Result<()> {
    let store = LogStore::from_sources(log_file).context("resolve log file location")?;

    if !json && filter.is_none() {
        return store.print_all().context("print log entries");
    }

    let mut entries = store.read_all().context("read log entries")?;
    if let Some(needle) = filter {
        let needle = needle.to_lowercase();
        entries.retain(|entry| matches_filter(entry, &needle));
    }

    for entry in &entries {
        if json {
            println!("{}", serde_json::to_string(entry)?);
        } else {
            println!("{entry}");
        }
    }
    Ok(())
}

fn cmd_path(log_file: Option<PathBuf>, dir: bool) -> Result<()> {
    // Same precedence as the store: explicit flag, EGET_LOG_FILE, platform default.
    let store = LogStore::from_sources(log_file).context("resolve log file location")?;
    if dir {
        match store.path().parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => println!("{}", parent.display()),
            None => println!("."),
        }
    } else {
        println!("{}", store.path().display());
    }
    Ok(())
}

/// The log format delimits fields with tabs and records with newlines and
/// performs no escaping, so user-supplied values must stay free of both.
fn ensure_plain_field(name: &str, value: &str) -> Result<()> {
    if value.contains('\t') || value.contains('\n') || value.contains('\r') {
        bail!("{name} must not contain tab or line-break characters");
    }
    Ok(())
}

fn matches_filter(entry: &LogEntry, needle: &str) -> bool {
    entry.repo.to_lowercase().contains(needle) || entry.path.to_lowercase().contains(needle)
}
