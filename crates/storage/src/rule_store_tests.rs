// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use warden_core::rule::{Decision, Provenance, RuleId, Scope};
use warden_core::workspace::WorkspaceId;

fn sample_rule() -> Rule {
    Rule {
        id: RuleId::new(),
        tool: "bash".to_string(),
        decision: Decision::Allow,
        executable: Some("ls".to_string()),
        pattern: None,
        scope: Scope::Global,
        session_id: None,
        workspace_id: None,
        expires_at_ms: None,
        provenance: Provenance::Manual,
        created_at_ms: 0,
    }
}

fn session_rule(session_id: SessionId) -> Rule {
    Rule {
        id: RuleId::new(),
        tool: "bash".to_string(),
        decision: Decision::Allow,
        executable: Some("git".to_string()),
        pattern: None,
        scope: Scope::Session,
        session_id: Some(session_id),
        workspace_id: None,
        expires_at_ms: None,
        provenance: Provenance::Learned,
        created_at_ms: 0,
    }
}

#[test]
fn open_creates_an_empty_rule_file_when_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    let store = RuleStore::open(&path).unwrap();
    assert!(store.get_all().is_empty());
    assert!(path.exists());
}

#[test]
fn insert_persists_and_is_visible_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    let store = RuleStore::open(&path).unwrap();
    store.insert(sample_rule()).unwrap();

    let reopened = RuleStore::open(&path).unwrap();
    assert_eq!(reopened.get_all().len(), 1);
}

#[test]
fn remove_by_id_drops_only_the_matching_rule() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    let rule = sample_rule();
    let id = rule.id.as_str().to_string();
    store.insert(rule).unwrap();
    store.insert(sample_rule()).unwrap();

    let removed = store.remove(&id).unwrap();
    assert!(removed);
    assert_eq!(store.get_all().len(), 1);
}

#[test]
fn reload_if_changed_is_false_when_mtime_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    assert!(!store.reload_if_changed().unwrap());
}

#[test]
fn add_returns_the_existing_rule_on_matching_signature() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    let first = store.add(sample_rule()).unwrap();
    let second = store.add(sample_rule()).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(store.get_all().len(), 1);
}

#[test]
fn add_fails_when_conflict_key_matches_with_a_different_decision() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    store.add(sample_rule()).unwrap();

    let mut deny_variant = sample_rule();
    deny_variant.decision = Decision::Deny;
    let err = store.add(deny_variant).unwrap_err();
    assert!(matches!(err, RuleStoreError::Conflict(_)));
    assert_eq!(store.get_all().len(), 1);
}

#[test]
fn hand_edited_file_is_picked_up_on_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    let store = RuleStore::open(&path).unwrap();

    let mut rules = vec![sample_rule()];
    rules[0].tool = "edit".to_string();
    let file = serde_json::json!({ "rules": rules });
    std::thread::sleep(std::time::Duration::from_millis(10));
    std::fs::write(&path, serde_json::to_vec_pretty(&file).unwrap()).unwrap();

    assert!(store.reload_if_changed().unwrap());
    assert_eq!(store.get_all()[0].tool, "edit");
}

#[test]
fn session_scoped_rules_never_touch_the_persisted_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    let store = RuleStore::open(&path).unwrap();
    let session_id = SessionId::new();
    store.add(session_rule(session_id.clone())).unwrap();

    assert_eq!(store.get_for_session(&session_id).len(), 1);
    assert!(store.get_global().is_empty());
    let on_disk: RuleFile = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert!(on_disk.rules.is_empty());
}

#[test]
fn clear_session_rules_drops_only_that_sessions_rules() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    let session_a = SessionId::new();
    let session_b = SessionId::new();
    store.add(session_rule(session_a.clone())).unwrap();
    store.add(session_rule(session_b.clone())).unwrap();

    store.clear_session_rules(&session_a);

    assert!(store.get_for_session(&session_a).is_empty());
    assert_eq!(store.get_for_session(&session_b).len(), 1);
}

#[test]
fn add_session_rule_without_a_session_id_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    let mut malformed = session_rule(SessionId::new());
    malformed.session_id = None;
    let err = store.add(malformed).unwrap_err();
    assert!(matches!(err, RuleStoreError::MissingSessionId));
}

#[test]
fn rules_for_combines_global_workspace_and_session_scopes() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    let workspace_id = WorkspaceId::new();
    let session_id = SessionId::new();

    store.add(sample_rule()).unwrap();
    let mut workspace_scoped = sample_rule();
    workspace_scoped.scope = Scope::Workspace;
    workspace_scoped.workspace_id = Some(workspace_id);
    store.add(workspace_scoped).unwrap();
    store.add(session_rule(session_id.clone())).unwrap();

    assert_eq!(store.rules_for(&session_id, &workspace_id).len(), 3);
}

#[test]
fn update_patches_a_persisted_rule_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    let rule = store.add(sample_rule()).unwrap();

    let patched = store
        .update(rule.id.as_str(), RulePatch { decision: Some(Decision::Deny), ..Default::default() })
        .unwrap()
        .unwrap();
    assert_eq!(patched.decision, Decision::Deny);
    assert_eq!(store.get_global()[0].decision, Decision::Deny);
}

#[test]
fn update_patches_a_session_rule_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    let session_id = SessionId::new();
    let rule = store.add(session_rule(session_id.clone())).unwrap();

    let patched = store
        .update(rule.id.as_str(), RulePatch { expires_at_ms: Some(Some(500)), ..Default::default() })
        .unwrap()
        .unwrap();
    assert_eq!(patched.expires_at_ms, Some(500));
}

#[test]
fn update_returns_none_for_an_unknown_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    assert!(store.update("rul-doesnotexist", RulePatch::default()).unwrap().is_none());
}

#[test]
fn seed_if_empty_only_seeds_when_the_store_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    store.seed_if_empty(vec![sample_rule()]).unwrap();
    assert_eq!(store.get_all().len(), 1);

    store.seed_if_empty(vec![sample_rule(), sample_rule()]).unwrap();
    assert_eq!(store.get_all().len(), 1, "already-seeded store must not be overwritten");
}

#[test]
fn ensure_workspace_defaults_seeds_once_per_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    let workspace_id = WorkspaceId::new();
    let root = dir.path();

    store.ensure_workspace_defaults(workspace_id, root, 0).unwrap();
    store.ensure_workspace_defaults(workspace_id, root, 0).unwrap();

    assert_eq!(store.get_for_workspace(&workspace_id).len(), 1);
}

#[test]
fn find_matching_combines_scopes_and_picks_the_most_specific_rule() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::open(dir.path().join("rules.json")).unwrap();
    let session_id = SessionId::new();
    let workspace_id = WorkspaceId::new();
    store.add(sample_rule()).unwrap();

    let found = store
        .find_matching("bash", Some("ls"), "ls", &session_id, &workspace_id, 0)
        .expect("the global rule should match");
    assert_eq!(found.decision, Decision::Allow);
}
