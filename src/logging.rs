//! File logging for ai.
//!
//! Log records go to `ai.log` in the data directory through a non-blocking
//! writer, never to the terminal. The filter comes from `AI_LOG` and falls
//! back to [`DEFAULT_LOG_FILTER`].

use std::fs::OpenOptions;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::constants::{DEFAULT_LOG_FILTER, LOG_ENV, LOG_FILENAME};

/// Installs the global subscriber. The returned guard flushes pending
/// records on drop and must live until exit. Returns `None` when the log
/// file cannot be opened; the program runs without logging then.
pub fn init() -> Option<WorkerGuard> {
    let dir = Config::data_dir().ok()?;
    init_in(&dir)
}

fn init_in(dir: &Path) -> Option<WorkerGuard> {
    std::fs::create_dir_all(dir).ok()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILENAME))
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .ok()?;
    Some(guard)
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}
