// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit log: one JSON object per line, rotated by size.
//!
//! Every Gate decision produces an [`AuditEntry`]; this is the record an
//! owner reviews after the fact, so appends must never be lost to a
//! torn write. Each append is its own `write` + `flush`; rotation swaps
//! the active file for a numbered backup rather than truncating.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use warden_core::audit::AuditEntry;

use crate::perms::{set_private_dir, set_private_file};

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per §6.4: rotate to `<name>.1` (overwriting any previous `.1`) once
/// the active file exceeds 10 MiB.
const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

pub struct AuditLog {
    path: PathBuf,
    max_bytes: u64,
    file: Mutex<File>,
}

impl AuditLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuditLogError> {
        Self::with_max_bytes(path, DEFAULT_MAX_BYTES)
    }

    pub fn with_max_bytes(path: impl Into<PathBuf>, max_bytes: u64) -> Result<Self, AuditLogError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
            set_private_dir(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        set_private_file(&path)?;
        Ok(Self { path, max_bytes, file: Mutex::new(file) })
    }

    /// Append one entry as a JSON line, rotating first if the file has
    /// grown past `max_bytes`.
    pub fn append(&self, entry: &AuditEntry) -> Result<(), AuditLogError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock();
        if file.metadata()?.len() + line.len() as u64 > self.max_bytes {
            drop(file);
            self.rotate()?;
            file = self.file.lock();
        }
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    fn rotate(&self) -> Result<(), AuditLogError> {
        let backup = rotated_path(&self.path);
        if backup.exists() {
            fs::remove_file(&backup)?;
        }
        fs::rename(&self.path, &backup)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        set_private_file(&self.path)?;
        *self.file.lock() = file;
        Ok(())
    }

    /// Read back every entry currently in the active (unrotated) file, in
    /// append order. Used by the control socket's admin log tail and by
    /// tests; not on any request-handling hot path.
    pub fn read_all(&self) -> Result<Vec<AuditEntry>, AuditLogError> {
        let _guard = self.file.lock();
        let contents = fs::read_to_string(&self.path)?;
        contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| Ok(serde_json::from_str(line)?))
            .collect()
    }
}

fn rotated_path(path: &Path) -> PathBuf {
    path.with_extension(format!("{}.1", path.extension().and_then(|e| e.to_str()).unwrap_or("log")))
}

#[cfg(test)]
#[path = "audit_log_tests.rs"]
mod tests;
