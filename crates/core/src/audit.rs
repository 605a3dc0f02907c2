// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit log entries: the durable record of every policy decision made.

use serde::{Deserialize, Serialize};

use crate::rule::Decision;
use crate::session::SessionId;
use crate::workspace::WorkspaceId;

crate::define_id! {
    /// Unique identifier for an audit entry.
    pub struct AuditId("adt-");
}

/// Who or what resolved a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    /// A matching rule resolved the decision without asking.
    Policy,
    /// The owner answered a pending decision interactively.
    User,
    /// The pending decision's timeout elapsed with no answer.
    Timeout,
    /// The client disconnected before the decision could be resolved.
    ExtensionLost,
}

crate::simple_display! {
    ResolvedBy {
        Policy => "policy",
        User => "user",
        Timeout => "timeout",
        ExtensionLost => "extension_lost",
    }
}

/// One durable record of a policy decision, written once and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    pub session_id: SessionId,
    pub workspace_id: WorkspaceId,
    pub tool: String,
    pub input: serde_json::Value,
    pub decision: Decision,
    pub resolved_by: ResolvedBy,
    /// The rule that matched, if `resolved_by` is `policy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule_id: Option<String>,
    /// The rule learned from this decision, if the owner's response scope
    /// wasn't `once` and `RuleStore::add` didn't hit a conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned_rule_id: Option<String>,
    pub created_at_ms: u64,
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
