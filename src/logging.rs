//! File-based tracing setup. The TUI owns the terminal, so log output goes
//! to a daily rolling file instead of stderr.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "dance-catalog.log";
const LOG_ENV_VAR: &str = "DANCE_CATALOG_LOG";
const DEFAULT_DIRECTIVE: &str = "dance_catalog=info";

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the program or buffered lines are lost on exit.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir).context("failed to create log directory")?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    Ok(guard)
}
