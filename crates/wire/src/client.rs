// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! StreamMux wire protocol: JSON messages exchanged with the mobile client
//! over its WebSocket connection. One connection multiplexes every session
//! the client is subscribed to; messages are internally tagged by `type`
//! so either side can add variants without breaking the other's matcher
//! on unrecognized fields.
//!
//! [`ServerMessage`] is the pure output of event translation — it carries
//! no sequence numbers. [`Frame`] is what actually goes out over the
//! socket (and into the durable ring): translation happens once, sequence
//! assignment happens twice, independently, at the session-ring and
//! per-connection layers.

use serde::{Deserialize, Serialize};

use warden_core::rule::{Decision, ResponseScope};
use warden_core::session::{SessionStatus, SessionUsage};

/// How much of a session's event stream a subscription receives. A
/// connection may hold at most one `Full` subscription at a time; a new
/// one demotes whichever session previously held it to `Notifications`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionLevel {
    Full,
    Notifications,
}

/// A message the mobile client sends over the WebSocket connection. Every
/// variant carries an optional `request_id`, echoed back on the matching
/// `rpc_result` reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving events for a session, optionally resuming from a
    /// previous per-session `seq` cursor.
    Subscribe {
        session_id: String,
        #[serde(default)]
        level: SubscriptionLevel,
        #[serde(default)]
        since_seq: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// Stop receiving events for a session.
    Unsubscribe {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// Send a chat message into a session's agent backend.
    Prompt {
        session_id: String,
        text: String,
        #[serde(default)]
        client_turn_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// Cancel the session's current turn without killing the backend.
    Abort {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// Answer a pending permission decision.
    PermissionResponse {
        decision_id: String,
        action: Decision,
        scope: ResponseScope,
        #[serde(default)]
        expires_in_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// Start a new session.
    CreateSession {
        workspace_id: String,
        model: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// Terminate a session's agent backend unconditionally.
    StopSession {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// Re-arm a session's guard after a fail-safe trip.
    RearmGuard {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// Request a synthetic `state` snapshot outside of subscribing.
    GetState {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl Default for SubscriptionLevel {
    fn default() -> Self {
        SubscriptionLevel::Full
    }
}

impl ClientMessage {
    /// The `request_id` this message carries, if any, for the matching
    /// `rpc_result` reply.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientMessage::Subscribe { request_id, .. }
            | ClientMessage::Unsubscribe { request_id, .. }
            | ClientMessage::Prompt { request_id, .. }
            | ClientMessage::Abort { request_id, .. }
            | ClientMessage::PermissionResponse { request_id, .. }
            | ClientMessage::CreateSession { request_id, .. }
            | ClientMessage::StopSession { request_id, .. }
            | ClientMessage::RearmGuard { request_id, .. }
            | ClientMessage::GetState { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// A message the daemon pushes to the mobile client over the WebSocket
/// connection (and, when the client is disconnected, via a push sink).
///
/// This is the pure target of event translation: no `seq`/`stream_seq`
/// here. See [`Frame`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected { session_count: u32 },
    /// Synthetic session snapshot sent on subscribe or `get_state`.
    State { session_id: String, status: SessionStatus, usage: SessionUsage },
    StreamConnected,

    TurnStart { session_id: String },
    TurnEnd { session_id: String },

    TextDelta { session_id: String, message_id: String, delta: String },
    ThinkingDelta { session_id: String, message_id: String, delta: String },
    ToolStart { session_id: String, tool_call_id: String, tool: String, input: serde_json::Value },
    /// A delta of a tool's output, or a media block re-encoded as a
    /// data-URI chunk; both arrive through this one ephemeral channel.
    ToolOutput { session_id: String, tool_call_id: String, delta: String },
    ToolEnd {
        session_id: String,
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<serde_json::Value>,
        #[serde(default)]
        is_error: bool,
    },

    AgentStart { session_id: String, backend_session_uuid: String },
    AgentEnd {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    MessageEnd { session_id: String, message_id: String },

    CompactionStart { session_id: String },
    CompactionEnd {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    RetryStart {
        session_id: String,
        attempt: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    RetryEnd { session_id: String },

    PermissionRequest {
        decision_id: String,
        session_id: String,
        tool: String,
        input: serde_json::Value,
        summary: String,
    },
    PermissionExpired { decision_id: String, session_id: String },
    PermissionCancelled { decision_id: String, session_id: String },

    StopRequested { session_id: String, source: String },
    StopConfirmed { session_id: String },
    StopFailed { session_id: String, reason: String },
    SessionEnded {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    SessionCreated { session_id: String, workspace_id: String, name: String },
    UsageUpdated { session_id: String, usage: SessionUsage },

    RpcResult { request_id: String, result: serde_json::Value },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        fatal: bool,
    },
}

impl ServerMessage {
    /// Whether this message belongs to the durable set (assigned a
    /// per-session `seq` and retained in the session's replay ring) versus
    /// ephemeral (broadcast to current subscribers only).
    pub fn is_durable(&self) -> bool {
        matches!(
            self,
            ServerMessage::AgentStart { .. }
                | ServerMessage::AgentEnd { .. }
                | ServerMessage::MessageEnd { .. }
                | ServerMessage::ToolStart { .. }
                | ServerMessage::ToolEnd { .. }
                | ServerMessage::PermissionRequest { .. }
                | ServerMessage::PermissionExpired { .. }
                | ServerMessage::PermissionCancelled { .. }
                | ServerMessage::StopRequested { .. }
                | ServerMessage::StopConfirmed { .. }
                | ServerMessage::StopFailed { .. }
                | ServerMessage::SessionEnded { .. }
                | ServerMessage::Error { .. }
        )
    }

    /// Whether this message's session-specific payload may be dropped
    /// under backpressure rather than block the send path.
    pub fn is_droppable(&self) -> bool {
        matches!(
            self,
            ServerMessage::TextDelta { .. }
                | ServerMessage::ThinkingDelta { .. }
                | ServerMessage::ToolOutput { .. }
        )
    }
}

/// A [`ServerMessage`] as it actually goes out over the wire: stamped with
/// whichever sequence spaces apply to its emission path. Durable messages
/// carry `seq` (the session ring's monotonic counter); every message sent
/// on a live connection carries `stream_seq` (the connection's own
/// monotonic counter) once `StreamMux` has accepted it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    #[serde(flatten)]
    pub message: ServerMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_seq: Option<u64>,
}

impl Frame {
    pub fn new(message: ServerMessage) -> Self {
        Self { message, seq: None, stream_seq: None }
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    pub fn with_stream_seq(mut self, stream_seq: u64) -> Self {
        self.stream_seq = Some(stream_seq);
        self
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
