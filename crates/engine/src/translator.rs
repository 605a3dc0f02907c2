// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure mapping from raw agent backend events to client wire messages.
//!
//! `translate` takes no lock and touches nothing but the per-turn
//! [`TurnContext`] it's given — this is what keeps the event pipeline free
//! of lock acquisition while it runs on the session's single consumer
//! task. Everything session-level (usage counters, persistence, push
//! notifications) is the orchestrator's job, driven off the same raw
//! event alongside this function's output, not from inside it.

use std::collections::HashMap;

use warden_core::event::AgentEvent;
use warden_core::session::SessionId;
use warden_wire::client::ServerMessage;

/// Per-turn streaming state the translator threads through one agent
/// turn. Reset on `agent_start`/`turn_start`/`message_end`.
#[derive(Debug, Default)]
pub struct TurnContext {
    /// Tool-call id -> text already flushed as a `tool_output` delta.
    partial_results: HashMap<String, String>,
    streamed_assistant_text: String,
    has_streamed_thinking: bool,
}

impl TurnContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.partial_results.clear();
        self.streamed_assistant_text.clear();
        self.has_streamed_thinking = false;
    }
}

/// Translate one raw agent event into zero or more client messages,
/// updating `ctx` in place.
pub fn translate(ctx: &mut TurnContext, session_id: &SessionId, event: AgentEvent) -> Vec<ServerMessage> {
    let session_id = session_id.to_string();
    match event {
        AgentEvent::AgentStart { backend_session_uuid } => {
            ctx.reset();
            vec![ServerMessage::AgentStart { session_id, backend_session_uuid }]
        }
        AgentEvent::AgentEnd { reason } => {
            ctx.reset();
            vec![ServerMessage::AgentEnd { session_id, reason }]
        }
        AgentEvent::TurnStart => {
            ctx.reset();
            vec![ServerMessage::TurnStart { session_id }]
        }
        AgentEvent::TurnEnd => vec![ServerMessage::TurnEnd { session_id }],

        AgentEvent::MessageUpdateText { message_id, delta } => {
            ctx.streamed_assistant_text.push_str(&delta);
            vec![ServerMessage::TextDelta { session_id, message_id, delta }]
        }
        AgentEvent::MessageUpdateThinking { message_id, delta } => {
            ctx.has_streamed_thinking = true;
            vec![ServerMessage::ThinkingDelta { session_id, message_id, delta }]
        }
        AgentEvent::MessageUpdateError { reason, .. } => {
            vec![ServerMessage::Error { error: reason, fatal: false }]
        }

        AgentEvent::ToolExecutionStart { tool_call_id, tool, input }
        | AgentEvent::MessageUpdateToolCall { tool_call_id, tool, input, .. } => {
            ctx.partial_results.insert(tool_call_id.clone(), String::new());
            vec![ServerMessage::ToolStart { session_id, tool_call_id, tool, input }]
        }
        AgentEvent::ToolExecutionUpdate { tool_call_id, text, media } => {
            tool_output_deltas(ctx, &session_id, tool_call_id, text, media)
        }
        AgentEvent::ToolExecutionEnd { tool_call_id, output, error } => {
            ctx.partial_results.remove(&tool_call_id);
            let is_error = error.is_some();
            vec![ServerMessage::ToolEnd { session_id, tool_call_id, output, is_error }]
        }

        AgentEvent::AutoCompactionStart => vec![ServerMessage::CompactionStart { session_id }],
        AgentEvent::AutoCompactionEnd { context_tokens } => {
            vec![ServerMessage::CompactionEnd {
                session_id,
                summary: Some(format!("{context_tokens} tokens in context")),
            }]
        }
        AgentEvent::AutoRetryStart { attempt, reason } => {
            vec![ServerMessage::RetryStart { session_id, attempt, reason }]
        }
        AgentEvent::AutoRetryEnd => vec![ServerMessage::RetryEnd { session_id }],

        // Token/cost usage reports drive session bookkeeping at the
        // orchestrator layer; they have no direct client emission.
        AgentEvent::Response { .. } => Vec::new(),

        AgentEvent::MessageEnd { message_id, final_text, final_thinking } => {
            let mut out = message_end_tail(ctx, &session_id, &message_id, final_text, final_thinking);
            out.push(ServerMessage::MessageEnd { session_id, message_id });
            ctx.reset();
            out
        }

        // No client emission: server-log only.
        AgentEvent::ExtensionError { message } => {
            tracing::warn!(%message, "agent backend reported an extension error");
            Vec::new()
        }
    }
}

fn tool_output_deltas(
    ctx: &mut TurnContext,
    session_id: &str,
    tool_call_id: String,
    text: Option<String>,
    media: Vec<warden_core::event::MediaBlock>,
) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    if let Some(text) = text {
        let buffered = ctx.partial_results.entry(tool_call_id.clone()).or_default();
        let delta = match text.strip_prefix(buffered.as_str()) {
            Some(delta) => delta.to_string(),
            // Backend text didn't extend what we'd buffered (a resend or a
            // correction); resync by emitting the whole new text.
            None => text.clone(),
        };
        if !delta.is_empty() {
            out.push(ServerMessage::ToolOutput {
                session_id: session_id.to_string(),
                tool_call_id: tool_call_id.clone(),
                delta,
            });
        }
        *buffered = text;
    }
    for block in media {
        out.push(ServerMessage::ToolOutput {
            session_id: session_id.to_string(),
            tool_call_id: tool_call_id.clone(),
            delta: format!("data:{};base64,{}", block.mime_type, block.data_base64),
        });
    }
    out
}

fn message_end_tail(
    ctx: &TurnContext,
    session_id: &str,
    message_id: &str,
    final_text: Option<String>,
    final_thinking: Option<String>,
) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    if let Some(final_text) = final_text {
        let tail = match final_text.strip_prefix(ctx.streamed_assistant_text.as_str()) {
            Some(tail) => tail.to_string(),
            None => longest_common_prefix_tail(&ctx.streamed_assistant_text, &final_text),
        };
        if !tail.is_empty() {
            out.push(ServerMessage::TextDelta {
                session_id: session_id.to_string(),
                message_id: message_id.to_string(),
                delta: tail,
            });
        }
    }
    if !ctx.has_streamed_thinking {
        if let Some(thinking) = final_thinking.filter(|t| !t.is_empty()) {
            out.push(ServerMessage::ThinkingDelta {
                session_id: session_id.to_string(),
                message_id: message_id.to_string(),
                delta: thinking,
            });
        }
    }
    out
}

/// The suffix of `finalized` after its longest common prefix with
/// `streamed` — used when the backend's final text doesn't cleanly extend
/// what was already streamed (a mid-stream correction).
fn longest_common_prefix_tail(streamed: &str, finalized: &str) -> String {
    let common = streamed.chars().zip(finalized.chars()).take_while(|(a, b)| a == b).count();
    finalized.chars().skip(common).collect()
}

#[cfg(test)]
#[path = "translator_tests.rs"]
mod tests;
