// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier and session record.
//!
//! A session is one live agent child process (or in-process backend) bound
//! to one owner-visible record. `SessionId` deliberately does not use the
//! [`crate::define_id!`] prefixed-nanoid scheme the rest of the system uses:
//! the wire protocol and mobile client expect an 8-character opaque id with
//! no type prefix.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::workspace::WorkspaceId;

const SESSION_ID_LEN: usize = 8;
const SESSION_ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Opaque 8-character session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random 8-character id.
    pub fn new() -> Self {
        Self(nanoid::nanoid!(SESSION_ID_LEN, &SESSION_ID_ALPHABET))
    }

    /// Wrap an existing string (for parsing / deserialization).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for SessionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SessionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status of a session.
///
/// Advances monotonically except for the `ready <-> busy` oscillation
/// during a session's active lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Starting,
    Ready,
    Busy,
    Stopping,
    Stopped,
    Error,
}

crate::simple_display! {
    SessionStatus {
        Starting => "starting",
        Ready => "ready",
        Busy => "busy",
        Stopping => "stopping",
        Stopped => "stopped",
        Error => "error",
    }
}

impl SessionStatus {
    /// Whether `next` is a legal transition from `self`.
    ///
    /// `ready` and `busy` oscillate freely; every other transition only
    /// moves forward through starting -> ready|busy -> stopping -> {stopped|error}.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Ready, Busy) | (Busy, Ready) => true,
            (Starting, Ready) | (Starting, Busy) | (Starting, Error) | (Starting, Stopping) => {
                true
            }
            (Ready, Stopping) | (Busy, Stopping) => true,
            (Ready, Error) | (Busy, Error) => true,
            (Stopping, Stopped) | (Stopping, Error) => true,
            _ => false,
        }
    }
}

/// Cumulative usage counters for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUsage {
    pub message_count: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    /// Cost in integer micro-dollars, to avoid float drift across persists.
    pub cost_micros: u64,
    pub files_changed: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    /// Tokens in context as of the most recent end-of-turn usage report.
    pub context_tokens: u64,
}

/// Runtime identifiers recovered for an agent backend, used to resume a
/// session's underlying process across a daemon restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRuntimeHandle {
    /// Path to the backend's persistent event-log file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log_path: Option<std::path::PathBuf>,
    /// The agent backend's own session identifier (distinct from [`SessionId`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_session_uuid: Option<String>,
}

/// A supervised agent session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub status: SessionStatus,
    pub created_at_ms: u64,
    pub last_activity_ms: u64,
    /// `<provider>/<model-id>`, e.g. `anthropic/claude-opus-4`.
    pub model: String,
    #[serde(default)]
    pub usage: SessionUsage,
    pub workspace_id: WorkspaceId,
    #[serde(default)]
    pub runtime: AgentRuntimeHandle,
}

impl Session {
    pub fn new(name: impl Into<String>, model: impl Into<String>, workspace_id: WorkspaceId) -> Self {
        Self {
            id: SessionId::new(),
            name: name.into(),
            status: SessionStatus::Starting,
            created_at_ms: 0,
            last_activity_ms: 0,
            model: model.into(),
            usage: SessionUsage::default(),
            workspace_id,
            runtime: AgentRuntimeHandle::default(),
        }
    }

    /// Attempt a status transition, returning `false` (no mutation) if illegal.
    pub fn transition_to(&mut self, next: SessionStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
