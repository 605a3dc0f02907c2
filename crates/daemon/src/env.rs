// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;

/// Protocol version reported over the control socket (from Cargo.toml).
pub const PROTOCOL_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"));

/// Resolve state directory: WARDEN_STATE_DIR > XDG_STATE_HOME/warden >
/// ~/.local/state/warden.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("WARDEN_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("warden"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/warden"))
}

/// Admin control-socket request timeout.
pub fn ipc_timeout() -> Duration {
    std::env::var("WARDEN_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// StreamMux WebSocket listener port override. `0` (the default) lets the
/// OS pick one; the chosen port is reported back over the control socket.
pub fn stream_mux_port() -> u16 {
    std::env::var("WARDEN_STREAM_MUX_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// AuthProxy HTTP listener port override.
pub fn auth_proxy_port() -> u16 {
    std::env::var("WARDEN_AUTH_PROXY_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Shutdown drain timeout (default 5s, configurable via `WARDEN_DRAIN_TIMEOUT_MS`).
pub fn drain_timeout() -> Duration {
    std::env::var("WARDEN_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
