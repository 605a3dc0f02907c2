// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_rule(decision: Decision) -> Rule {
    Rule {
        id: RuleId::new(),
        tool: "bash".to_string(),
        decision,
        executable: Some("rm".to_string()),
        pattern: Some("rm -rf *".to_string()),
        scope: Scope::Workspace,
        session_id: None,
        workspace_id: Some(WorkspaceId::new()),
        expires_at_ms: None,
        provenance: Provenance::Manual,
        created_at_ms: 0,
    }
}

#[test]
fn conflict_key_ignores_decision() {
    let allow = sample_rule(Decision::Allow);
    let mut deny = sample_rule(Decision::Deny);
    deny.id = allow.id.clone();
    deny.workspace_id = allow.workspace_id;

    assert_eq!(allow.conflict_key(), deny.conflict_key());
    assert_ne!(allow.signature(), deny.signature());
}

#[test]
fn is_expired_compares_against_now() {
    let mut rule = sample_rule(Decision::Allow);
    rule.expires_at_ms = Some(1_000);
    assert!(rule.is_expired(1_001));
    assert!(!rule.is_expired(999));
    assert!(!rule.is_expired(1_000));
}

#[test]
fn rule_with_no_expiry_never_expires() {
    let rule = sample_rule(Decision::Ask);
    assert!(!rule.is_expired(u64::MAX));
}

#[test]
fn once_response_scope_never_maps_to_a_rule_scope() {
    assert_eq!(ResponseScope::Once.to_rule_scope(), None);
    assert_eq!(ResponseScope::Session.to_rule_scope(), Some(Scope::Session));
    assert_eq!(ResponseScope::Workspace.to_rule_scope(), Some(Scope::Workspace));
    assert_eq!(ResponseScope::Global.to_rule_scope(), Some(Scope::Global));
}

#[test]
fn decision_display_matches_wire_casing() {
    assert_eq!(Decision::Allow.to_string(), "allow");
    assert_eq!(Decision::Ask.to_string(), "ask");
    assert_eq!(Decision::Deny.to_string(), "deny");
}
