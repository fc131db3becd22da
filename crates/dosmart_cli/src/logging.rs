//! Tracing setup. Command-line runs log to stderr; the full-screen board owns
//! the terminal, so it only logs when `DOSMART_LOG_FILE` names a file.

use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_FILTER_ENV_VAR: &str = "DOSMART_LOG";
const LOG_FILE_ENV_VAR: &str = "DOSMART_LOG_FILE";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"))
}

pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn init_for_board() {
    let Some(file) = log_file() else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn log_file() -> Option<File> {
    let path = std::env::var(LOG_FILE_ENV_VAR).ok()?;
    if path.trim().is_empty() {
        return None;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}
