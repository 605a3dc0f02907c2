// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identifier type for tracking scheduled timers.
//!
//! A `TimerId` uniquely identifies a timer instance used to schedule delayed
//! actions: session heartbeats, idle shutdowns, pending-decision timeouts,
//! and live-activity debounce windows. Unlike the [`crate::define_id!`]
//! family, a `TimerId` is a composed string (kind tag + owning id) rather
//! than a fixed-width nanoid, so the orchestrator can recover a timer's
//! purpose from its id alone on restart without a separate side table.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decision::PendingDecisionId;
use crate::session::SessionId;

/// Identifier for a scheduled timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(String);

impl TimerId {
    fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self::new(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn heartbeat(session: &SessionId) -> Self {
        TimerKind::Heartbeat(session.clone()).to_timer_id()
    }

    pub fn idle(session: &SessionId) -> Self {
        TimerKind::Idle(session.clone()).to_timer_id()
    }

    pub fn approval(decision: &PendingDecisionId) -> Self {
        TimerKind::Approval(decision.clone()).to_timer_id()
    }

    pub fn debounce(session: &SessionId) -> Self {
        TimerKind::Debounce(session.clone()).to_timer_id()
    }

    /// Parse this timer ID into a typed `TimerKind`.
    pub fn kind(&self) -> Option<TimerKind> {
        TimerKind::parse(&self.0)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for TimerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Parsed representation of a timer ID for type-safe routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// Periodic liveness check for a session's agent backend.
    Heartbeat(SessionId),
    /// Fires when a ready session has had no activity for its idle window.
    Idle(SessionId),
    /// Fires when a pending decision's owner-response window elapses.
    Approval(PendingDecisionId),
    /// Coalesces rapid-fire live activity updates into one push.
    Debounce(SessionId),
}

impl TimerKind {
    /// Parse a timer id string into a `TimerKind`.
    ///
    /// Returns `None` for unrecognized timer id formats.
    pub fn parse(id: &str) -> Option<TimerKind> {
        if let Some(rest) = id.strip_prefix("heartbeat:") {
            return Some(TimerKind::Heartbeat(SessionId::from_string(rest)));
        }
        if let Some(rest) = id.strip_prefix("idle:") {
            return Some(TimerKind::Idle(SessionId::from_string(rest)));
        }
        if let Some(rest) = id.strip_prefix("approval:") {
            return Some(TimerKind::Approval(PendingDecisionId::from_string(rest)));
        }
        if let Some(rest) = id.strip_prefix("debounce:") {
            return Some(TimerKind::Debounce(SessionId::from_string(rest)));
        }
        None
    }

    /// Format this `TimerKind` back into a canonical `TimerId`.
    pub fn to_timer_id(&self) -> TimerId {
        match self {
            TimerKind::Heartbeat(session) => TimerId::new(format!("heartbeat:{session}")),
            TimerKind::Idle(session) => TimerId::new(format!("idle:{session}")),
            TimerKind::Approval(decision) => TimerId::new(format!("approval:{decision}")),
            TimerKind::Debounce(session) => TimerId::new(format!("debounce:{session}")),
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            TimerKind::Heartbeat(s) | TimerKind::Idle(s) | TimerKind::Debounce(s) => Some(s),
            TimerKind::Approval(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
