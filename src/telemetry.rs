// SPDX-License-Identifier: MIT
//
// Log setup for the demo.
//
// The terminal is in raw mode while the demo runs, so logs can never go to
// stdout or stderr. They go to the file named by `TERMO_LOG`, filtered by
// `RUST_LOG`. Without `TERMO_LOG` no subscriber is installed at all.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const LOG_FILE_ENV: &str = "TERMO_LOG";

/// Install the file logger if `TERMO_LOG` is set. Returns whether logging
/// is active.
pub fn init_tracing(default_level: &str) -> bool {
    let Some(path) = log_file_path_from_env() else {
        return false;
    };

    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("warning: failed to open log file {}: {err}", path.display());
            return false;
        }
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_names(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .is_ok()
}

fn log_file_path_from_env() -> Option<PathBuf> {
    std::env::var_os(LOG_FILE_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
