// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative policy configuration: the JSON file an operator hand-edits
//! to ship hard-deny guardrails, a compiled permission list, and heuristic
//! switches ahead of any learned rule. Parsed once at daemon startup (or
//! whenever an operator reloads it), then [`CompiledPolicy::compile`]d into
//! the shape [`crate::engine::evaluate`] actually walks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use warden_core::rule::Decision;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyConfigError {
    #[error("unsupported schemaVersion {0}, expected 1")]
    UnsupportedSchemaVersion(u32),
    #[error("permission {0:?} has no match criteria: at least one of tool/executable/commandMatches/pathMatches/pathWithin/domain is required")]
    EmptyMatch(String),
    #[error("permission id {0:?} is not a valid slug (3-64 chars, alphanumeric/-/_)")]
    InvalidId(String),
}

/// A match criterion for a compiled permission or guardrail. At least one
/// field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_matches: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_matches: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_within: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl PermissionMatch {
    fn is_empty(&self) -> bool {
        self.tool.is_none()
            && self.executable.is_none()
            && self.command_matches.is_none()
            && self.path_matches.is_none()
            && self.path_within.is_none()
            && self.domain.is_none()
    }
}

/// One entry of `guardrails` or `permissions`: a labeled decision bound to
/// a match criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    #[serde(deserialize_with = "deserialize_decision", serialize_with = "serialize_decision")]
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub immutable: bool,
    #[serde(rename = "match")]
    pub match_: PermissionMatch,
}

/// A heuristic's configured action, or `false` to disable it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeuristicAction {
    Disabled,
    Decision(Decision),
}

impl Serialize for HeuristicAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HeuristicAction::Disabled => serializer.serialize_bool(false),
            HeuristicAction::Decision(decision) => decision.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for HeuristicAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::Bool(false) => Ok(HeuristicAction::Disabled),
            serde_json::Value::Bool(true) => Err(serde::de::Error::custom("heuristic action must be false or a decision string, not true")),
            serde_json::Value::String(s) => decision_from_str(s).map(HeuristicAction::Decision).map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!("invalid heuristic action: {other}"))),
        }
    }
}

fn default_heuristic_action(default: Decision) -> HeuristicAction {
    HeuristicAction::Decision(default)
}

/// Structural-heuristic switches. Each defaults to `ask` when the config
/// omits it, except `browser_eval`/`browser_unknown_domain`, which default
/// to `ask` as well — there is no heuristic this system enables as `allow`
/// by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Heuristics {
    pub pipe_to_shell: HeuristicAction,
    pub data_egress: HeuristicAction,
    pub secret_env_in_url: HeuristicAction,
    pub secret_file_access: HeuristicAction,
    pub browser_unknown_domain: HeuristicAction,
    pub browser_eval: HeuristicAction,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            pipe_to_shell: default_heuristic_action(Decision::Ask),
            data_egress: default_heuristic_action(Decision::Ask),
            secret_env_in_url: default_heuristic_action(Decision::Ask),
            secret_file_access: default_heuristic_action(Decision::Deny),
            browser_unknown_domain: default_heuristic_action(Decision::Ask),
            browser_eval: default_heuristic_action(Decision::Ask),
        }
    }
}

/// The declarative policy file format (schema version 1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_decision", serialize_with = "serialize_decision")]
    pub fallback: Decision,
    #[serde(default)]
    pub guardrails: Vec<Permission>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub heuristics: Heuristics,
}

impl PolicyConfig {
    /// Parse and validate a policy config document.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<(), PolicyConfigError> {
        if self.schema_version != 1 {
            return Err(PolicyConfigError::UnsupportedSchemaVersion(self.schema_version));
        }
        for permission in self.guardrails.iter().chain(self.permissions.iter()) {
            if !is_valid_slug(&permission.id) {
                return Err(PolicyConfigError::InvalidId(permission.id.clone()));
            }
            if permission.match_.is_empty() {
                return Err(PolicyConfigError::EmptyMatch(permission.id.clone()));
            }
        }
        Ok(())
    }

    /// The builtin config shipped when no operator-authored policy file
    /// exists: hard-denies the secrets an agent must never read directly,
    /// plus a conservative bash guardrail against destructive invocations.
    pub fn default_config() -> Self {
        Self {
            schema_version: 1,
            mode: None,
            description: Some("Built-in default guardrails".to_string()),
            fallback: Decision::Ask,
            guardrails: vec![
                Permission {
                    id: "block-auth-json-read".to_string(),
                    decision: Decision::Deny,
                    label: Some("Block agent auth file access".to_string()),
                    reason: Some("Protect API keys and session credentials stored in the agent's auth file".to_string()),
                    immutable: true,
                    match_: PermissionMatch { path_matches: Some("**/agent/auth.json".to_string()), ..Default::default() },
                },
                Permission {
                    id: "block-ssh-keys".to_string(),
                    decision: Decision::Deny,
                    label: Some("Block SSH private key access".to_string()),
                    reason: Some("Protect SSH private keys".to_string()),
                    immutable: true,
                    match_: PermissionMatch { path_matches: Some("**/.ssh/id_*".to_string()), ..Default::default() },
                },
                Permission {
                    id: "block-credential-files".to_string(),
                    decision: Decision::Deny,
                    label: Some("Block credential file access".to_string()),
                    reason: Some("Protect files that look like stored credentials".to_string()),
                    immutable: true,
                    match_: PermissionMatch { path_matches: Some("**/*credentials*".to_string()), ..Default::default() },
                },
                Permission {
                    id: "block-rm-rf-root".to_string(),
                    decision: Decision::Deny,
                    label: Some("Block recursive delete of a filesystem root".to_string()),
                    reason: Some("Refuse destructive deletes of a root-level path".to_string()),
                    immutable: true,
                    match_: PermissionMatch {
                        executable: Some("rm".to_string()),
                        command_matches: Some("rm -rf /".to_string()),
                        ..Default::default()
                    },
                },
            ],
            permissions: Vec::new(),
            heuristics: Heuristics::default(),
        }
    }
}

/// The precompiled form [`crate::engine::evaluate`] walks: guardrails split
/// into the hard-deny subset (only `deny` guardrails are unconditional —
/// `allow`/`ask` guardrails would otherwise let an operator pre-approve a
/// whole class of calls, which isn't what "hard" means here) plus the
/// ordered `permissions` list, the fallback, and the heuristic switches.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPolicy {
    pub hard_deny: Vec<Permission>,
    pub permissions: Vec<Permission>,
    pub fallback: Decision,
    pub heuristics: Heuristics,
}

impl CompiledPolicy {
    pub fn compile(config: &PolicyConfig) -> Self {
        Self {
            hard_deny: config.guardrails.iter().filter(|p| p.decision == Decision::Deny).cloned().collect(),
            permissions: config.permissions.clone(),
            fallback: config.fallback,
            heuristics: config.heuristics.clone(),
        }
    }

    pub fn from_default() -> Self {
        Self::compile(&PolicyConfig::default_config())
    }
}

fn is_valid_slug(id: &str) -> bool {
    (3..=64).contains(&id.len()) && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn decision_from_str(s: &str) -> Result<Decision, String> {
    match s {
        "allow" => Ok(Decision::Allow),
        "ask" => Ok(Decision::Ask),
        "deny" | "block" => Ok(Decision::Deny),
        other => Err(format!("invalid decision {other:?}: expected allow, ask, deny, or block")),
    }
}

/// Accepts `"block"` as a synonym for `"deny"`, matching the declarative
/// config format even though [`Decision`] itself has no `Block` variant.
fn deserialize_decision<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decision, D::Error> {
    let s = String::deserialize(deserializer)?;
    decision_from_str(&s).map_err(serde::de::Error::custom)
}

fn serialize_decision<S: Serializer>(decision: &Decision, serializer: S) -> Result<S::Ok, S::Error> {
    decision.serialize(serializer)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
