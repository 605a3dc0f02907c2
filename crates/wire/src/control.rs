// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin control protocol: requests the `warden` CLI sends over the local
//! control socket, and the responses `wardend` sends back. Deliberately
//! small — interactive session control belongs to the mobile client over
//! the [`crate::client`] WebSocket protocol, not this socket.

use serde::{Deserialize, Serialize};

/// Request from the `warden` CLI to the daemon's control socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Liveness probe.
    Ping,
    /// Version/capability handshake, sent immediately after connecting.
    Hello { client_version: String },
    /// Summary of daemon health: sessions, gate port, uptime.
    Status,
    /// Request an orderly shutdown.
    Shutdown,
    /// Tail the daemon's structured log file.
    Logs {
        #[serde(default)]
        lines: Option<usize>,
        #[serde(default)]
        follow: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub name: String,
    pub status: String,
    pub workspace_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusReport {
    pub daemon_version: String,
    pub uptime_ms: u64,
    pub gate_port: u16,
    pub stream_mux_port: u16,
    pub auth_proxy_port: u16,
    pub sessions: Vec<SessionSummary>,
}

/// Response from the daemon's control socket to the `warden` CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlResponse {
    Pong,
    Hello { daemon_version: String },
    Status { report: StatusReport },
    ShuttingDown,
    LogLines { lines: Vec<String> },
    Error { message: String },
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
