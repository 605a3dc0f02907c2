// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon path configuration and the exclusive-lock file that keeps a
//! second `wardend` from starting against the same state directory.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use fs2::FileExt;
use thiserror::Error;

use crate::env;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not resolve a state directory: $HOME is not set")]
    NoStateDir,
    #[error("another wardend instance is already running against this state directory")]
    LockFailed(#[source] std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Filesystem layout for one daemon instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. `~/.local/state/warden`).
    pub state_dir: PathBuf,
    /// Admin control socket (Unix domain).
    pub control_socket_path: PathBuf,
    /// Exclusive lock / PID file.
    pub lock_path: PathBuf,
    /// Structured log file (rotated by `tracing-appender`).
    pub log_path: PathBuf,
    /// Root directory `FileDocumentStore` persists config/sessions/workspaces under.
    pub documents_dir: PathBuf,
    /// Rule store file.
    pub rules_path: PathBuf,
    /// Audit log file.
    pub audit_log_path: PathBuf,
    /// Declarative policy document (guardrails/permissions/heuristics). Falls
    /// back to the built-in default policy when absent.
    pub policy_config_path: PathBuf,
}

impl Config {
    /// Load configuration for the single-owner host daemon: fixed paths
    /// under the resolved state directory, one daemon per host.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = env::state_dir()?;
        Ok(Self {
            control_socket_path: state_dir.join("control.sock"),
            lock_path: state_dir.join("wardend.pid"),
            log_path: state_dir.join("wardend.log"),
            documents_dir: state_dir.join("documents"),
            rules_path: state_dir.join("rules.json"),
            audit_log_path: state_dir.join("audit.jsonl"),
            policy_config_path: state_dir.join("policy.json"),
            state_dir,
        })
    }
}

/// Held for the daemon's lifetime; releases the exclusive lock on drop.
pub struct LockFile {
    #[allow(dead_code)]
    file: File,
}

/// Acquire the exclusive instance lock, writing this process's pid. Fails
/// immediately (non-blocking) if another daemon already holds it.
pub fn acquire_lock(config: &Config) -> Result<LockFile, ConfigError> {
    std::fs::create_dir_all(&config.state_dir)?;
    let file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    file.try_lock_exclusive().map_err(ConfigError::LockFailed)?;
    file.set_len(0)?;
    let mut file = file;
    writeln!(file, "{}", std::process::id())?;
    Ok(LockFile { file })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
