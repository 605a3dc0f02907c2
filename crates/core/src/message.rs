// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted transcript entries: the document store's record of what was
//! said in a session, independent of the in-memory session ring used for
//! live catch-up. Retained after a session ends; the ring is not.

use serde::{Deserialize, Serialize};

use crate::session::SessionId;

crate::define_id! {
    /// Unique identifier for a persisted transcript entry.
    pub struct MessageId("msg-");
}

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

crate::simple_display! {
    MessageRole {
        User => "user",
        Assistant => "assistant",
        System => "system",
    }
}

/// One persisted entry in a session's transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: MessageRole,
    pub text: String,
    pub created_at_ms: u64,
}

impl SessionMessage {
    pub fn new(session_id: SessionId, role: MessageRole, text: impl Into<String>) -> Self {
        Self { id: MessageId::new(), session_id, role, text: text.into(), created_at_ms: 0 }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
