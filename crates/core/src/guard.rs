// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Guard: per-session state of the Gate's connection to an agent's gate
//! shim.
//!
//! A session starts `unguarded` (created, shim not yet connected). The
//! shim's `guard_ready` moves it to `guarded`, the only state in which tool
//! calls are evaluated. A lost heartbeat or a closed TCP connection trips
//! `fail_safe`, which denies every tool call until the shim reconnects and
//! the owner explicitly re-arms the session.

use serde::{Deserialize, Serialize};

/// State of a session's gate connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// Created; no gate shim has connected yet.
    Unguarded,
    /// Shim connected and heartbeating; tool calls are evaluated normally.
    Guarded,
    /// Heartbeat lost or TCP connection closed; every tool call denies.
    FailSafe,
}

crate::simple_display! {
    GuardState {
        Unguarded => "unguarded",
        Guarded => "guarded",
        FailSafe => "fail_safe",
    }
}

impl GuardState {
    /// Whether tool calls should proceed to policy evaluation at all.
    pub fn allows_evaluation(self) -> bool {
        matches!(self, GuardState::Guarded)
    }
}

/// A session's gate guard: connection state, assigned port, and the last
/// time a heartbeat was seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guard {
    pub state: GuardState,
    /// OS-assigned TCP port the shim connects to; 0 for virtual guards
    /// (in-process agents, which skip the TCP handshake entirely).
    pub tcp_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub changed_at_ms: u64,
}

impl Guard {
    pub fn new(tcp_port: u16, now_ms: u64) -> Self {
        Self {
            state: GuardState::Unguarded,
            tcp_port,
            last_heartbeat_ms: None,
            reason: None,
            changed_at_ms: now_ms,
        }
    }

    /// The shim sent `guard_ready`.
    pub fn connect(&mut self, now_ms: u64) {
        self.state = GuardState::Guarded;
        self.reason = None;
        self.last_heartbeat_ms = Some(now_ms);
        self.changed_at_ms = now_ms;
    }

    pub fn record_heartbeat(&mut self, now_ms: u64) {
        self.last_heartbeat_ms = Some(now_ms);
    }

    /// Whether the last heartbeat is older than `max_age_ms`. Only
    /// meaningful while `guarded`; a guard that never connected isn't
    /// "stale", it's simply unguarded.
    pub fn heartbeat_is_stale(&self, now_ms: u64, max_age_ms: u64) -> bool {
        match self.last_heartbeat_ms {
            Some(last) => now_ms.saturating_sub(last) > max_age_ms,
            None => false,
        }
    }

    pub fn trip_fail_safe(&mut self, reason: impl Into<String>, now_ms: u64) {
        self.state = GuardState::FailSafe;
        self.reason = Some(reason.into());
        self.changed_at_ms = now_ms;
    }

    /// Reset to `unguarded`, ready for the shim to reconnect. Valid from
    /// any state.
    pub fn rearm(&mut self, now_ms: u64) {
        self.state = GuardState::Unguarded;
        self.reason = None;
        self.last_heartbeat_ms = None;
        self.changed_at_ms = now_ms;
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
