// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The server's own persisted configuration: the handful of settings an
//! owner can change at runtime without restarting `wardend`, stored
//! alongside sessions and workspaces in the document store (see §6.3).

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_idle_timeout_ms() -> u64 {
    Duration::from_secs(600).as_millis() as u64
}

fn default_approval_timeout_ms() -> u64 {
    Duration::from_secs(120).as_millis() as u64
}

fn default_heartbeat_interval_ms() -> u64 {
    Duration::from_secs(15).as_millis() as u64
}

/// Server-wide runtime configuration, mutable at runtime via
/// `updateConfig` and otherwise falling back to these defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the declarative policy configuration file (§6.1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_config_path: Option<std::path::PathBuf>,
    /// Path to the credential file the auth proxy reads real provider
    /// credentials from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_store_path: Option<std::path::PathBuf>,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_approval_timeout_ms")]
    pub approval_timeout_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Owner-visible display name, surfaced to the mobile client on `connected`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            policy_config_path: None,
            credential_store_path: None,
            idle_timeout_ms: default_idle_timeout_ms(),
            approval_timeout_ms: default_approval_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            display_name: None,
        }
    }
}

impl ServerConfig {
    /// Merge a partial update (as sent by `updateConfig`) over `self`,
    /// leaving any field the patch omits untouched.
    pub fn merge_patch(&mut self, patch: serde_json::Value) -> Result<(), serde_json::Error> {
        let mut current = serde_json::to_value(&*self)?;
        merge_json(&mut current, patch);
        *self = serde_json::from_value(current)?;
        Ok(())
    }
}

fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(base.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (base, patch) => *base = patch,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
