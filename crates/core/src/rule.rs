// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule: the unit of policy decision.

use serde::{Deserialize, Serialize};

use crate::session::SessionId;
use crate::workspace::WorkspaceId;

crate::define_id! {
    /// Unique identifier for a rule.
    pub struct RuleId("rul-");
}

/// The decision a rule or policy layer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Ask,
    Deny,
}

crate::simple_display! {
    Decision {
        Allow => "allow",
        Ask => "ask",
        Deny => "deny",
    }
}

/// The scope a rule is valid within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Session,
    Workspace,
    Global,
}

crate::simple_display! {
    Scope {
        Session => "session",
        Workspace => "workspace",
        Global => "global",
    }
}

/// The scope an owner's decision response asks to be remembered at. A
/// superset of [`Scope`]: `once` means "resolve this one tool call only",
/// and never produces a persisted rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseScope {
    Once,
    Session,
    Workspace,
    Global,
}

crate::simple_display! {
    ResponseScope {
        Once => "once",
        Session => "session",
        Workspace => "workspace",
        Global => "global",
    }
}

impl ResponseScope {
    /// The persisted-rule [`Scope`] this response scope maps to, or `None`
    /// for `once` (resolve only, never learn a rule).
    pub fn to_rule_scope(self) -> Option<Scope> {
        match self {
            ResponseScope::Once => None,
            ResponseScope::Session => Some(Scope::Session),
            ResponseScope::Workspace => Some(Scope::Workspace),
            ResponseScope::Global => Some(Scope::Global),
        }
    }
}

/// Where a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Shipped with the policy config.
    Preset,
    /// Generated from an owner's approval of a pending decision.
    Learned,
    /// Added directly by the owner (e.g. via the mobile client's rule editor).
    Manual,
}

/// The unit of policy decision: a (tool, pattern) match bound to a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    /// Tool name, or `"*"` to match any tool.
    pub tool: String,
    pub decision: Decision,
    /// Required executable match (e.g. the leading argv0 of a bash command).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    /// Path glob (file tools) or command glob (`bash`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<WorkspaceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<u64>,
    pub provenance: Provenance,
    pub created_at_ms: u64,
}

/// The subset of a rule's fields that identify a conflict class: two rules
/// sharing a conflict key may not carry different decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConflictKey {
    pub tool: String,
    pub scope: Scope,
    pub pattern: Option<String>,
    pub executable: Option<String>,
    pub session_id: Option<SessionId>,
    pub workspace_id: Option<WorkspaceId>,
}

impl std::hash::Hash for Scope {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (*self as u8).hash(state);
    }
}

/// The full identity of a rule: conflict key plus decision. Two rules with
/// equal signatures are duplicates and must collapse to one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleSignature {
    pub key: ConflictKey,
    pub decision: Decision,
}

impl std::hash::Hash for Decision {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (*self as u8).hash(state);
    }
}

impl Rule {
    pub fn conflict_key(&self) -> ConflictKey {
        ConflictKey {
            tool: self.tool.clone(),
            scope: self.scope,
            pattern: self.pattern.clone(),
            executable: self.executable.clone(),
            session_id: self.session_id.clone(),
            workspace_id: self.workspace_id,
        }
    }

    pub fn signature(&self) -> RuleSignature {
        RuleSignature { key: self.conflict_key(), decision: self.decision }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        matches!(self.expires_at_ms, Some(exp) if exp < now_ms)
    }
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
