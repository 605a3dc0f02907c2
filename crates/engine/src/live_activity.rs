// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LiveActivityBridge: collapses a stream of session events into a single
//! "latest snapshot" push payload for a per-owner live-status surface
//! (an iOS Live Activity or an Android persistent notification).
//!
//! Kept in the same synchronous, lock-scoped style as
//! [`crate::broadcaster::SessionBroadcaster`]: `update` merges into a
//! pending payload and tells the caller whether to arm a debounce timer;
//! `flush` (driven by that timer firing) hands back the coalesced
//! snapshot as an effect. Nothing here touches a clock or spawns a task —
//! that's the runtime loop's job, the same way it executes every other
//! [`Effect`].

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use warden_core::effect::Effect;
use warden_core::session::{SessionId, SessionStatus};
use warden_core::timer::TimerId;

/// Debounce window: rapid-fire updates within this window collapse into
/// one push.
pub const DEFAULT_LIVE_ACTIVITY_DEBOUNCE: Duration = Duration::from_millis(750);

/// One merge-able field update. `None` leaves the corresponding pending
/// field untouched (latest non-null wins); `priority` is folded in as a
/// max; `end` is sticky, once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct LiveActivityUpdate {
    pub status: Option<SessionStatus>,
    pub active_tool: Option<String>,
    /// Explicitly clear `active_tool` (a tool call just finished). Only
    /// consulted when `active_tool` itself is `None` — a concurrent tool
    /// starting in the same update always wins.
    pub tool_finished: bool,
    pub pending_permissions: Option<u32>,
    pub last_event: Option<String>,
    pub elapsed_seconds: Option<u64>,
    pub priority: u8,
    pub end: bool,
}

#[derive(Debug, Clone)]
struct PendingPayload {
    status: SessionStatus,
    active_tool: Option<String>,
    pending_permissions: u32,
    last_event: Option<String>,
    elapsed_seconds: u64,
    priority: u8,
    end: bool,
}

impl PendingPayload {
    fn seed(update: &LiveActivityUpdate, fallback_status: SessionStatus) -> Self {
        Self {
            status: update.status.unwrap_or(fallback_status),
            active_tool: if update.tool_finished { None } else { update.active_tool.clone() },
            pending_permissions: update.pending_permissions.unwrap_or(0),
            last_event: update.last_event.clone(),
            elapsed_seconds: update.elapsed_seconds.unwrap_or(0),
            priority: update.priority,
            end: update.end,
        }
    }

    fn merge(&mut self, update: &LiveActivityUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if update.active_tool.is_some() {
            self.active_tool = update.active_tool.clone();
        } else if update.tool_finished {
            self.active_tool = None;
        }
        if let Some(count) = update.pending_permissions {
            self.pending_permissions = count;
        }
        if update.last_event.is_some() {
            self.last_event = update.last_event.clone();
        }
        if let Some(elapsed) = update.elapsed_seconds {
            self.elapsed_seconds = elapsed;
        }
        self.priority = self.priority.max(update.priority);
        self.end = self.end || update.end;
    }

    fn into_effect(self, session_id: SessionId) -> Effect {
        Effect::PushLiveActivity {
            session_id,
            status: self.status,
            active_tool: self.active_tool,
            pending_permissions: self.pending_permissions,
            last_event: self.last_event,
            elapsed_seconds: self.elapsed_seconds,
            end: self.end,
        }
    }
}

/// Debounced per-session live-activity coalescer.
#[derive(Default)]
pub struct LiveActivityBridge {
    pending: Mutex<HashMap<SessionId, PendingPayload>>,
}

impl LiveActivityBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `update` into the session's pending payload. Returns a
    /// `SetTimer` effect for the debounce window the first time a
    /// session accumulates a pending update since its last flush; `None`
    /// every subsequent call until that timer fires.
    pub fn update(&self, session_id: &SessionId, update: LiveActivityUpdate, current_status: SessionStatus) -> Option<Effect> {
        let mut pending = self.pending.lock();
        match pending.get_mut(session_id) {
            Some(existing) => {
                existing.merge(&update);
                None
            }
            None => {
                pending.insert(session_id.clone(), PendingPayload::seed(&update, current_status));
                Some(Effect::SetTimer { id: TimerId::debounce(session_id), duration: DEFAULT_LIVE_ACTIVITY_DEBOUNCE })
            }
        }
    }

    /// The debounce timer fired: take the accumulated payload (clearing
    /// it) and produce the push effect for it. `None` if nothing has
    /// accumulated since the last flush (a stray or duplicate timer).
    pub fn flush(&self, session_id: &SessionId) -> Option<Effect> {
        let payload = self.pending.lock().remove(session_id)?;
        Some(payload.into_effect(session_id.clone()))
    }

    /// Whether a session currently has an unflushed pending payload.
    pub fn has_pending(&self, session_id: &SessionId) -> bool {
        self.pending.lock().contains_key(session_id)
    }
}

#[cfg(test)]
#[path = "live_activity_tests.rs"]
mod tests;
