// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects represent side effects the orchestrator needs to perform.
//!
//! Handlers never call adapters directly: they return a `Vec<Effect>`, and a
//! runtime loop executes each one against the real (or test-double) world.
//! This keeps the decision logic itself pure and unit-testable.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decision::PendingDecisionId;
use crate::event::AgentEvent;
use crate::session::{SessionId, SessionStatus};
use crate::timer::TimerId;
use crate::workspace::WorkspaceId;

/// Effects that need to be executed by the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Effect {
    // === Agent backend effects ===
    /// Spawn a new agent backend process for a session.
    SpawnAgentBackend {
        session_id: SessionId,
        workspace_id: WorkspaceId,
        model: String,
        cwd: PathBuf,
        env: Vec<(String, String)>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system_prompt: Option<String>,
        /// Backend session uuid to resume, if restarting after a daemon crash.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resume_uuid: Option<String>,
    },

    /// Tell a session's agent backend to proceed with or deny a tool call.
    RespondToToolCall {
        session_id: SessionId,
        tool_call_id: String,
        allow: bool,
    },

    /// Kill a session's agent backend process.
    KillAgentBackend { session_id: SessionId },

    // === Timer effects ===
    SetTimer {
        id: TimerId,
        #[serde(with = "duration_serde")]
        duration: Duration,
    },
    CancelTimer { id: TimerId },

    // === Internal bus / audit ===
    /// Record a raw backend event for audit/replay purposes.
    Emit { session_id: SessionId, event: AgentEvent },

    // === Push notifications to the mobile client ===
    /// Push a permission request for a pending decision.
    PushPermission {
        decision_id: PendingDecisionId,
        session_id: SessionId,
        summary: String,
    },

    /// Push an arbitrary session event (message delta, tool result, status
    /// change) over the live WebSocket connection and/or a background push.
    PushSessionEvent {
        session_id: SessionId,
        payload: serde_json::Value,
    },

    /// Push a coalesced live-activity update (iOS Live Activity / Android
    /// persistent notification) reflecting the session's current content
    /// state, as debounced by the engine's `LiveActivityBridge`.
    PushLiveActivity {
        session_id: SessionId,
        status: SessionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        active_tool: Option<String>,
        pending_permissions: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_event: Option<String>,
        elapsed_seconds: u64,
        end: bool,
    },
}

impl Effect {
    /// Effect name for log spans (e.g. "spawn_agent_backend", "push_permission").
    pub fn name(&self) -> &'static str {
        match self {
            Effect::SpawnAgentBackend { .. } => "spawn_agent_backend",
            Effect::RespondToToolCall { .. } => "respond_to_tool_call",
            Effect::KillAgentBackend { .. } => "kill_agent_backend",
            Effect::SetTimer { .. } => "set_timer",
            Effect::CancelTimer { .. } => "cancel_timer",
            Effect::Emit { .. } => "emit",
            Effect::PushPermission { .. } => "push_permission",
            Effect::PushSessionEvent { .. } => "push_session_event",
            Effect::PushLiveActivity { .. } => "push_live_activity",
        }
    }

    /// Key-value pairs for structured logging.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::SpawnAgentBackend { session_id, workspace_id, model, cwd, .. } => vec![
                ("session_id", session_id.to_string()),
                ("workspace_id", workspace_id.to_string()),
                ("model", model.clone()),
                ("cwd", cwd.display().to_string()),
            ],
            Effect::RespondToToolCall { session_id, tool_call_id, allow } => vec![
                ("session_id", session_id.to_string()),
                ("tool_call_id", tool_call_id.clone()),
                ("allow", allow.to_string()),
            ],
            Effect::KillAgentBackend { session_id } => {
                vec![("session_id", session_id.to_string())]
            }
            Effect::SetTimer { id, duration } => {
                vec![("timer_id", id.to_string()), ("duration_ms", duration.as_millis().to_string())]
            }
            Effect::CancelTimer { id } => vec![("timer_id", id.to_string())],
            Effect::Emit { session_id, event } => {
                vec![("session_id", session_id.to_string()), ("event", event.name().to_string())]
            }
            Effect::PushPermission { decision_id, session_id, .. } => vec![
                ("decision_id", decision_id.to_string()),
                ("session_id", session_id.to_string()),
            ],
            Effect::PushSessionEvent { session_id, .. } => {
                vec![("session_id", session_id.to_string())]
            }
            Effect::PushLiveActivity { session_id, status, .. } => {
                vec![("session_id", session_id.to_string()), ("status", status.to_string())]
            }
        }
    }

    /// Whether to log both 'started' and 'completed' or just 'executed',
    /// to control verbosity for frequent effects.
    pub fn verbose(&self) -> bool {
        match self {
            Effect::SetTimer { .. }
            | Effect::CancelTimer { .. }
            | Effect::Emit { .. }
            | Effect::PushSessionEvent { .. } => false,
            _ => true,
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        duration.as_millis().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
