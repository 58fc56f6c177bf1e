// logging.rs — tracing subscriber setup for a run.
//
// Two layers: brief records on stderr, and (with --logdir) full records with
// timestamps, thread ids and source locations in <logdir>/tack.log.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::error::OptionsError;

pub const LOG_FILE_NAME: &str = "tack.log";

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Check a `--level` value, returning its canonical lowercase spelling.
pub fn validate_level(level: &str) -> Result<&'static str, OptionsError> {
    let lowered = level.trim().to_ascii_lowercase();
    LEVELS
        .iter()
        .find(|l| **l == lowered)
        .copied()
        .ok_or_else(|| OptionsError::InvalidLevel(level.to_string()))
}

/// The effective level: `quiet` forces `error`.
pub fn effective_level(level: &str, quiet: bool) -> Result<&'static str, OptionsError> {
    let level = validate_level(level)?;
    Ok(if quiet { "error" } else { level })
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed (a second run in
/// the same process, or a test harness); the existing one is kept.
pub fn setup_logging(level: &str, quiet: bool, log_dir: Option<&Path>) -> Result<bool, OptionsError> {
    let level = effective_level(level, quiet)?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .with_filter(filter(level));

    let file_layer = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|source| OptionsError::IoError {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = dir.join(LOG_FILE_NAME);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| OptionsError::IoError { path, source })?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(filter(level)),
            )
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    if !installed {
        tracing::debug!("tracing subscriber already installed; keeping it");
    }
    Ok(installed)
}

/// RUST_LOG wins over the configured level when set.
fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
