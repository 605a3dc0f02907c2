// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gate protocol: newline-delimited JSON exchanged between an agent
//! backend's permission hook and the daemon's Gate listener over a
//! single long-lived connection per session.
//!
//! Each request blocks the calling tool until a matching response arrives;
//! the connection carries many request/response pairs over its lifetime,
//! which is why this uses NDJSON instead of the admin control socket's
//! one-shot length-prefixed framing.

use serde::{Deserialize, Serialize};

/// A tool-call permission request from an agent backend's hook process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateRequest {
    pub session_id: String,
    pub tool_call_id: String,
    pub tool: String,
    pub input: serde_json::Value,
}

/// The Gate's answer to a [`GateRequest`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateResponse {
    pub tool_call_id: String,
    pub decision: GateDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One NDJSON line sent by the agent's gate shim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateInbound {
    GuardReady { session_id: String, extension_version: String },
    GateCheck(GateRequest),
    Heartbeat,
}

/// One NDJSON line sent by the Gate back to the shim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateOutbound {
    GuardAck { status: String },
    GateResult(GateResponse),
    HeartbeatAck,
}

/// Encode one NDJSON line: compact JSON plus a trailing newline.
pub fn encode_line<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

/// Decode one NDJSON line (the newline, if present, is trimmed first).
pub fn decode_line<T: for<'de> Deserialize<'de>>(line: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line.trim_end_matches('\n'))
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
