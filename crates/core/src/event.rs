// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw agent backend events.
//!
//! These are the events an [`crate::AgentBackend`](../adapters, not this
//! crate) reports as an agent session runs. The orchestrator's event
//! translator consumes a stream of these and produces outbound wire
//! messages plus effects; nothing in this crate interprets them directly.

use serde::{Deserialize, Serialize};

/// One raw event reported by an agent backend's process stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    AgentStart {
        backend_session_uuid: String,
    },
    AgentEnd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    TurnStart,
    TurnEnd,
    MessageUpdateText {
        message_id: String,
        delta: String,
    },
    MessageUpdateThinking {
        message_id: String,
        delta: String,
    },
    MessageUpdateError {
        message_id: String,
        reason: String,
    },
    /// A tool call surfacing inline in the streamed assistant message.
    /// Carries the same `(tool_call_id, tool, input)` triple as
    /// [`AgentEvent::ToolExecutionStart`] — the translator treats the two
    /// identically, since in this event vocabulary they both mean "a tool
    /// call has begun".
    MessageUpdateToolCall {
        message_id: String,
        tool_call_id: String,
        tool: String,
        input: serde_json::Value,
    },
    ToolExecutionStart {
        tool_call_id: String,
        tool: String,
        input: serde_json::Value,
    },
    /// Incremental tool output arriving while a tool call is still running.
    ToolExecutionUpdate {
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        media: Vec<MediaBlock>,
    },
    ToolExecutionEnd {
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    AutoCompactionStart,
    AutoCompactionEnd {
        context_tokens: u64,
    },
    AutoRetryStart {
        attempt: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    AutoRetryEnd,
    Response {
        message_id: String,
        input_tokens: u64,
        output_tokens: u64,
        cache_read_tokens: u64,
        cache_write_tokens: u64,
        cost_micros: u64,
    },
    MessageEnd {
        message_id: String,
        /// The backend's own record of the full assistant text for this
        /// message, used to recover any tail the streamed deltas missed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        final_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        final_thinking: Option<String>,
    },
    ExtensionError {
        message: String,
    },
}

/// One inline media attachment produced by a tool (an image, a diff
/// rendering), carried as base64 payload plus its MIME type so the client
/// can embed it as a data URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaBlock {
    pub mime_type: String,
    pub data_base64: String,
}

impl AgentEvent {
    /// Event name for log spans (e.g. "agent_start", "tool_execution_end").
    pub fn name(&self) -> &'static str {
        match self {
            AgentEvent::AgentStart { .. } => "agent_start",
            AgentEvent::AgentEnd { .. } => "agent_end",
            AgentEvent::TurnStart => "turn_start",
            AgentEvent::TurnEnd => "turn_end",
            AgentEvent::MessageUpdateText { .. } => "message_update_text",
            AgentEvent::MessageUpdateThinking { .. } => "message_update_thinking",
            AgentEvent::MessageUpdateError { .. } => "message_update_error",
            AgentEvent::MessageUpdateToolCall { .. } => "message_update_tool_call",
            AgentEvent::ToolExecutionStart { .. } => "tool_execution_start",
            AgentEvent::ToolExecutionUpdate { .. } => "tool_execution_update",
            AgentEvent::ToolExecutionEnd { .. } => "tool_execution_end",
            AgentEvent::AutoCompactionStart => "auto_compaction_start",
            AgentEvent::AutoCompactionEnd { .. } => "auto_compaction_end",
            AgentEvent::AutoRetryStart { .. } => "auto_retry_start",
            AgentEvent::AutoRetryEnd => "auto_retry_end",
            AgentEvent::Response { .. } => "response",
            AgentEvent::MessageEnd { .. } => "message_end",
            AgentEvent::ExtensionError { .. } => "extension_error",
        }
    }

    /// Whether this event indicates the agent backend is requesting a tool
    /// run and must go through policy evaluation before executing.
    pub fn is_tool_request(&self) -> bool {
        matches!(self, AgentEvent::ToolExecutionStart { .. } | AgentEvent::MessageUpdateToolCall { .. })
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
