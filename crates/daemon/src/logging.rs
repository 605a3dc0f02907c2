// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tracing` initialization: stdout plus a stable file under the state
//! directory, both honoring `RUST_LOG`. The file uses a fixed name (not
//! date-rotated) so `Daemon::tail_log` can always find it at
//! `Config::log_path` without having to guess today's suffix.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Install the global subscriber. The returned guard must stay alive for
/// the process lifetime or the background file-writer thread is dropped
/// and buffered log lines are lost.
pub fn init(log_path: &Path) -> std::io::Result<WorkerGuard> {
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file_appender = tracing_appender::rolling::never(
        log_path.parent().unwrap_or_else(|| Path::new(".")),
        log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("wardend.log")),
    );
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,warden=debug"));

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(true);
    let file_layer = tracing_subscriber::fmt::layer().with_target(true).with_ansi(false).with_writer(file_writer);

    tracing_subscriber::registry().with(env_filter).with(stdout_layer).with(file_layer).init();

    Ok(guard)
}
