// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending decisions: tool calls parked awaiting an owner's `allow`/`deny`
//! answer, surfaced to the mobile client as a push notification.

use serde::{Deserialize, Serialize};

use crate::rule::Decision;
use crate::session::SessionId;
use crate::workspace::WorkspaceId;

crate::define_id! {
    /// Unique identifier for a pending decision.
    pub struct PendingDecisionId("pdc-");
}

/// A tool call parked awaiting an owner decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDecision {
    pub id: PendingDecisionId,
    pub session_id: SessionId,
    pub workspace_id: WorkspaceId,
    pub tool: String,
    pub input: serde_json::Value,
    /// The agent backend's own identifier for this tool call, echoed back
    /// when the backend is told to proceed or be denied.
    pub tool_call_id: String,
    /// Short human-readable summary for the push notification / client UI.
    pub summary: String,
    /// Why the policy engine could not resolve this on its own.
    pub reason: String,
    pub created_at_ms: u64,
    /// `None` means the decision never times out on its own (a zero-length
    /// approval timer disables expiry rather than firing immediately).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_at_ms: Option<u64>,
}

impl PendingDecision {
    pub fn expires(&self) -> bool {
        self.timeout_at_ms.is_some()
    }

    pub fn is_timed_out(&self, now_ms: u64) -> bool {
        matches!(self.timeout_at_ms, Some(t) if now_ms >= t)
    }
}

/// The answer an owner (or the timeout/disconnect path) gives to a pending
/// decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAnswer {
    Allow,
    Deny,
}

impl From<DecisionAnswer> for Decision {
    fn from(answer: DecisionAnswer) -> Self {
        match answer {
            DecisionAnswer::Allow => Decision::Allow,
            DecisionAnswer::Deny => Decision::Deny,
        }
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
