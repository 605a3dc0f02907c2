// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy evaluation: given the compiled policy config, the owner's rule
//! set, and a tool call, decide allow/ask/deny.
//!
//! Evaluation walks eight layers in strict precedence order, stopping at
//! the first that produces an answer:
//!
//! 1. `hard_deny` — compiled guardrails with `decision: deny`, unconditional.
//! 2. `learned_deny` — any matching `deny` rule the owner has taught the
//!    system, regardless of which scope it lives at.
//! 3. `session_rule` — rules scoped to this session.
//! 4. `workspace_rule` — rules scoped to this workspace.
//! 5. `global_rule` — rules scoped globally.
//! 6. `compiled` — the policy config's `permissions` list, first match wins.
//! 7. `heuristic` — structural risk signals (see [`crate::heuristics`]).
//! 8. `default` — the policy config's `fallback`.
//!
//! A flat specificity score across every layer at once would let a
//! narrow-scoped `allow` outrank a global `deny` just because it names a
//! more specific pattern. Layering first and breaking ties by specificity
//! only within a layer is what keeps deny-precedence intact.

use warden_core::rule::{Decision, Provenance, Rule, Scope};
use warden_core::session::SessionId;
use warden_core::workspace::WorkspaceId;

use crate::config::{CompiledPolicy, HeuristicAction, Permission};
use crate::glob::{glob_match, literal_prefix, path_glob_match};
use crate::heuristics;

/// Tool names whose policy match text is a file path rather than a bash
/// command line.
const FILE_TOOLS: &[&str] = &["read", "write", "edit", "find", "ls"];

/// The outcome of evaluating one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyOutcome {
    pub decision: Decision,
    /// The rule or compiled-permission id that produced this decision, if
    /// any — `None` for a heuristic or the default fallback.
    pub matched_rule_id: Option<String>,
    /// Which of the eight layers produced this outcome, for audit logging.
    pub layer: &'static str,
}

/// Evaluate a tool call that is a single, non-bash invocation (file edit,
/// network fetch, etc.).
///
/// `match_text` is whatever field the tool's rules are written against —
/// typically a file path.
pub fn evaluate_tool_call(
    rules: &[Rule],
    policy: &CompiledPolicy,
    session_id: &SessionId,
    workspace_id: &WorkspaceId,
    tool: &str,
    executable: Option<&str>,
    match_text: &str,
    now_ms: u64,
) -> PolicyOutcome {
    evaluate_rule_layers(rules, policy, session_id, workspace_id, tool, executable, match_text, now_ms)
        .or_else(|| secret_file_heuristic_outcome(policy, tool, match_text))
        .unwrap_or(PolicyOutcome { decision: policy.fallback, matched_rule_id: None, layer: "default" })
}

/// Evaluate a bash command line.
///
/// Layers 1-6 plus the per-command heuristics (`data_egress`,
/// `secret_env_in_url`) run against each chain-split simple command
/// individually (see `warden_shell::split_simple_commands`); `pipe_to_shell`
/// needs pipeline adjacency that splitting destroys, so it runs once
/// against the original, unsplit command text. The most restrictive
/// outcome across all of these wins.
///
/// A command that fails to parse is evaluated as `ask`: there is no safe
/// way to reason about what an unparseable command does.
pub fn evaluate_bash_command(
    rules: &[Rule],
    policy: &CompiledPolicy,
    session_id: &SessionId,
    workspace_id: &WorkspaceId,
    command: &str,
    now_ms: u64,
) -> PolicyOutcome {
    let Ok(simple_commands) = warden_shell::split_simple_commands(command) else {
        return PolicyOutcome { decision: Decision::Ask, matched_rule_id: None, layer: "unparseable" };
    };

    let mut worst: Option<PolicyOutcome> = None;
    for simple in &simple_commands {
        let executable = warden_shell::leading_argv0(simple);
        let text = render_command(simple);
        let outcome = evaluate_rule_layers(
            rules,
            policy,
            session_id,
            workspace_id,
            "bash",
            executable.as_deref(),
            &text,
            now_ms,
        )
        .or_else(|| segment_heuristic_outcome(policy, &text));
        if let Some(outcome) = outcome {
            worst = Some(combine_worst(worst, outcome));
        }
    }

    if let Some(decision) = heuristic_action(policy.heuristics.pipe_to_shell) {
        if heuristics::pipe_to_shell(command) {
            worst = Some(combine_worst(
                worst,
                PolicyOutcome { decision, matched_rule_id: None, layer: "heuristic:pipe_to_shell" },
            ));
        }
    }

    worst.unwrap_or(PolicyOutcome { decision: policy.fallback, matched_rule_id: None, layer: "default" })
}

/// Layers 1-6: hard-deny guardrails, learned denies, per-scope rules, and
/// the compiled permission list. Returns `None` if nothing in these
/// layers applies, leaving heuristics and the fallback to the caller.
fn evaluate_rule_layers(
    rules: &[Rule],
    policy: &CompiledPolicy,
    session_id: &SessionId,
    workspace_id: &WorkspaceId,
    tool: &str,
    executable: Option<&str>,
    match_text: &str,
    now_ms: u64,
) -> Option<PolicyOutcome> {
    for guardrail in &policy.hard_deny {
        if permission_matches(guardrail, tool, executable, match_text) {
            return Some(PolicyOutcome {
                decision: Decision::Deny,
                matched_rule_id: Some(guardrail.id.clone()),
                layer: "hard_deny",
            });
        }
    }

    let applies = |rule: &&Rule| {
        !rule.is_expired(now_ms)
            && (rule.tool == "*" || rule.tool == tool)
            && executable_matches(rule, executable)
            && pattern_matches(rule, tool, match_text)
            && applies_to_scope(rule, session_id, workspace_id)
    };

    let learned_deny = rules
        .iter()
        .filter(|rule| rule.provenance == Provenance::Learned && rule.decision == Decision::Deny)
        .filter(applies);
    if let Some(rule) = best_rule_match(learned_deny) {
        return Some(PolicyOutcome {
            decision: Decision::Deny,
            matched_rule_id: Some(rule.id.as_str().to_string()),
            layer: "learned_deny",
        });
    }

    for (scope, layer) in
        [(Scope::Session, "session_rule"), (Scope::Workspace, "workspace_rule"), (Scope::Global, "global_rule")]
    {
        let scoped = rules.iter().filter(|rule| rule.scope == scope).filter(applies);
        if let Some(rule) = best_rule_match(scoped) {
            return Some(PolicyOutcome {
                decision: rule.decision,
                matched_rule_id: Some(rule.id.as_str().to_string()),
                layer,
            });
        }
    }

    for permission in &policy.permissions {
        if permission_matches(permission, tool, executable, match_text) {
            return Some(PolicyOutcome {
                decision: permission.decision,
                matched_rule_id: Some(permission.id.clone()),
                layer: "compiled",
            });
        }
    }

    None
}

fn segment_heuristic_outcome(policy: &CompiledPolicy, command_text: &str) -> Option<PolicyOutcome> {
    if let Some(decision) = heuristic_action(policy.heuristics.data_egress) {
        if heuristics::data_egress(command_text) {
            return Some(PolicyOutcome { decision, matched_rule_id: None, layer: "heuristic:data_egress" });
        }
    }
    if let Some(decision) = heuristic_action(policy.heuristics.secret_env_in_url) {
        if heuristics::secret_in_url(command_text) {
            return Some(PolicyOutcome { decision, matched_rule_id: None, layer: "heuristic:secret_env_in_url" });
        }
    }
    None
}

fn secret_file_heuristic_outcome(policy: &CompiledPolicy, tool: &str, path: &str) -> Option<PolicyOutcome> {
    if !FILE_TOOLS.contains(&tool) {
        return None;
    }
    let decision = heuristic_action(policy.heuristics.secret_file_access)?;
    if heuristics::secret_file_access(path) {
        Some(PolicyOutcome { decision, matched_rule_id: None, layer: "heuristic:secret_file_access" })
    } else {
        None
    }
}

fn heuristic_action(action: HeuristicAction) -> Option<Decision> {
    match action {
        HeuristicAction::Disabled => None,
        HeuristicAction::Decision(decision) => Some(decision),
    }
}

/// The more restrictive of two outcomes, by [`severity`]. Ties favor the
/// first (earlier-evaluated) outcome.
fn combine_worst(current: Option<PolicyOutcome>, candidate: PolicyOutcome) -> PolicyOutcome {
    match current {
        Some(current) if severity(current.decision) >= severity(candidate.decision) => current,
        _ => candidate,
    }
}

fn render_command(simple: &warden_shell::SimpleCommand) -> String {
    let mut parts = Vec::new();
    if let Some(name) = warden_shell::word_literal(&simple.name) {
        parts.push(name);
    }
    for arg in &simple.args {
        parts.push(warden_shell::word_literal(arg).unwrap_or_default());
    }
    parts.join(" ")
}

/// Higher means "more restrictive"; used to pick the worst outcome across
/// a chain-split command and its heuristics.
fn severity(decision: Decision) -> u8 {
    match decision {
        Decision::Allow => 0,
        Decision::Ask => 1,
        Decision::Deny => 2,
    }
}

fn applies_to_scope(rule: &Rule, session_id: &SessionId, workspace_id: &WorkspaceId) -> bool {
    match rule.scope {
        Scope::Global => true,
        Scope::Workspace => rule.workspace_id.as_ref() == Some(workspace_id),
        Scope::Session => rule.session_id.as_ref() == Some(session_id),
    }
}

/// Whether `rule` applies to a tool call, ignoring scope — callers (e.g.
/// `warden-storage`'s rule lookups) are expected to have already narrowed
/// `rules` down to the scopes that matter for a given session/workspace.
pub fn rule_applies(rule: &Rule, tool: &str, executable: Option<&str>, match_text: &str, now_ms: u64) -> bool {
    !rule.is_expired(now_ms)
        && (rule.tool == "*" || rule.tool == tool)
        && executable_matches(rule, executable)
        && pattern_matches(rule, tool, match_text)
}

/// The most specific rule in `rules`, by [`matcher_specificity`].
pub fn best_match<'a>(rules: impl Iterator<Item = &'a Rule>) -> Option<&'a Rule> {
    best_rule_match(rules)
}

fn executable_matches(rule: &Rule, executable: Option<&str>) -> bool {
    match (&rule.executable, executable) {
        (Some(wanted), Some(actual)) => wanted == actual,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

fn pattern_matches(rule: &Rule, tool: &str, match_text: &str) -> bool {
    match &rule.pattern {
        Some(pattern) if tool == "bash" => glob_match(pattern, match_text),
        Some(pattern) => path_glob_match(pattern, match_text),
        None => true,
    }
}

fn permission_matches(permission: &Permission, tool: &str, executable: Option<&str>, match_text: &str) -> bool {
    let criteria = &permission.match_;
    if let Some(wanted_tool) = &criteria.tool {
        if wanted_tool != tool {
            return false;
        }
    }
    if let Some(wanted_exec) = &criteria.executable {
        match executable {
            Some(actual) if actual == wanted_exec => {}
            _ => return false,
        }
    }
    if let Some(pattern) = &criteria.command_matches {
        if tool != "bash" || !glob_match(pattern, match_text) {
            return false;
        }
    }
    if let Some(pattern) = &criteria.path_matches {
        if !path_glob_match(pattern, match_text) {
            return false;
        }
    }
    if let Some(prefix) = &criteria.path_within {
        if !match_text.starts_with(prefix.as_str()) {
            return false;
        }
    }
    if let Some(domain) = &criteria.domain {
        if !match_text.contains(domain.as_str()) {
            return false;
        }
    }
    true
}

/// Specificity score for tie-breaking within a single layer: whether a
/// rule pins both pattern and executable, just one, or neither, then how
/// long a literal (non-wildcard) prefix its pattern commits to.
fn matcher_specificity(rule: &Rule) -> (u8, usize) {
    let kind_rank = match (rule.pattern.is_some(), rule.executable.is_some()) {
        (true, true) => 3,
        (true, false) => 2,
        (false, true) => 1,
        (false, false) => 0,
    };
    let prefix_len = rule.pattern.as_deref().map(|p| literal_prefix(p).len()).unwrap_or(0);
    (kind_rank, prefix_len)
}

fn best_rule_match<'a>(rules: impl Iterator<Item = &'a Rule>) -> Option<&'a Rule> {
    rules.max_by_key(|rule| matcher_specificity(rule))
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
