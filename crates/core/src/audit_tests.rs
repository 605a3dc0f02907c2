// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::workspace::WorkspaceId;

fn sample_entry() -> AuditEntry {
    AuditEntry {
        id: AuditId::new(),
        session_id: SessionId::new(),
        workspace_id: WorkspaceId::new(),
        tool: "bash".to_string(),
        input: serde_json::json!({ "command": "ls" }),
        decision: Decision::Allow,
        resolved_by: ResolvedBy::Policy,
        matched_rule_id: Some("rul-abc".to_string()),
        created_at_ms: 100,
    }
}

#[test]
fn audit_entry_roundtrips_through_json() {
    let entry = sample_entry();
    let json = serde_json::to_string(&entry).unwrap();
    let back: AuditEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(entry.id, back.id);
    assert_eq!(back.resolved_by, ResolvedBy::Policy);
}

#[test]
fn matched_rule_id_absent_for_user_resolution() {
    let mut entry = sample_entry();
    entry.resolved_by = ResolvedBy::User;
    entry.matched_rule_id = None;
    let json = serde_json::to_string(&entry).unwrap();
    assert!(!json.contains("matched_rule_id"));
}

#[test]
fn resolved_by_display_matches_wire_casing() {
    assert_eq!(ResolvedBy::ExtensionLost.to_string(), "extension_lost");
    assert_eq!(ResolvedBy::Timeout.to_string(), "timeout");
}
