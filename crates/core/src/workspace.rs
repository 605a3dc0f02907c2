// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identifier and configuration bundle.
//!
//! A workspace is a named configuration bundle referenced by sessions.
//! Deleting a workspace must never cascade-delete sessions: orphaned
//! sessions retain their `workspace_id` even after the workspace record
//! itself is gone.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a workspace instance.
    pub struct WorkspaceId("wks-");
}

/// Read/write access granted to a path outside the workspace mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathAccess {
    Read,
    ReadWrite,
}

/// An additional path made visible to a session beyond its workspace mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedPath {
    pub path: PathBuf,
    pub access: PathAccess,
}

/// A named configuration bundle referenced by one or more sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    /// Host directory this workspace mounts into sessions, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_dir: Option<PathBuf>,
    #[serde(default)]
    pub allowed_paths: Vec<AllowedPath>,
    #[serde(default)]
    pub allowed_executables: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Declarative permission overlay, compiled into additional policy
    /// rules ahead of the global policy config (see `warden-policy`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_overlay: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl Workspace {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: WorkspaceId::new(), name: name.into(), ..Default::default() }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
