// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use warden_core::config::ServerConfig;
use warden_core::device_token::{AuthDeviceToken, PushDeviceToken, PushTokenKind};
use warden_core::message::{MessageRole, SessionMessage};
use warden_core::session::{Session, SessionId};
use warden_core::workspace::{Workspace, WorkspaceId};

use super::*;

#[test]
fn get_config_defaults_when_nothing_persisted_yet() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    let config = store.get_config().unwrap();
    assert_eq!(config.idle_timeout_ms, ServerConfig::default().idle_timeout_ms);
}

#[test]
fn update_config_persists_the_patch_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    store.update_config(serde_json::json!({ "display_name": "Alice's Mac" })).unwrap();
    let config = store.get_config().unwrap();
    assert_eq!(config.display_name.as_deref(), Some("Alice's Mac"));
}

#[test]
fn session_round_trips_through_save_get_list_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    let session = Session::new("my session", "anthropic/claude-opus-4", WorkspaceId::new());

    store.save_session(&session).unwrap();
    assert_eq!(store.get_session(&session.id).unwrap().unwrap().name, "my session");
    assert_eq!(store.list_sessions().unwrap().len(), 1);

    store.delete_session(&session.id).unwrap();
    assert!(store.get_session(&session.id).unwrap().is_none());
}

#[test]
fn get_session_for_an_unknown_id_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    assert!(store.get_session(&SessionId::new()).unwrap().is_none());
}

#[test]
fn workspace_round_trips_through_save_get_list_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    let workspace = Workspace::new("my workspace");

    store.save_workspace(&workspace).unwrap();
    assert_eq!(store.get_workspace(&workspace.id).unwrap().unwrap().name, "my workspace");
    assert_eq!(store.list_workspaces().unwrap().len(), 1);

    store.delete_workspace(&workspace.id).unwrap();
    assert!(store.get_workspace(&workspace.id).unwrap().is_none());
}

#[test]
fn deleting_a_workspace_does_not_touch_its_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    let workspace = Workspace::new("my workspace");
    let session = Session::new("s", "m", workspace.id);
    store.save_workspace(&workspace).unwrap();
    store.save_session(&session).unwrap();

    store.delete_workspace(&workspace.id).unwrap();
    assert!(store.get_session(&session.id).unwrap().is_some());
}

#[test]
fn session_messages_append_and_list_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    let session_id = SessionId::new();

    store.add_session_message(&SessionMessage::new(session_id.clone(), MessageRole::User, "hi")).unwrap();
    store.add_session_message(&SessionMessage::new(session_id.clone(), MessageRole::Assistant, "hello")).unwrap();

    let messages = store.get_session_messages(&session_id).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].text, "hi");
    assert_eq!(messages[1].text, "hello");
}

#[test]
fn deleting_a_session_removes_its_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    let session = Session::new("s", "m", WorkspaceId::new());
    store.save_session(&session).unwrap();
    store.add_session_message(&SessionMessage::new(session.id.clone(), MessageRole::User, "hi")).unwrap();

    store.delete_session(&session.id).unwrap();
    assert!(store.get_session_messages(&session.id).unwrap().is_empty());
}

#[test]
fn push_device_tokens_accumulate_and_dedupe_by_token() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    store
        .add_push_device_token(PushDeviceToken { token: "a".to_string(), kind: PushTokenKind::Remote, registered_at_ms: 1 })
        .unwrap();
    store
        .add_push_device_token(PushDeviceToken { token: "a".to_string(), kind: PushTokenKind::LiveActivity, registered_at_ms: 2 })
        .unwrap();

    let tokens = store.get_push_device_tokens().unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, PushTokenKind::LiveActivity);
}

#[test]
fn auth_device_tokens_accumulate() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    store
        .add_auth_device_token(AuthDeviceToken { token: "t1".to_string(), device_name: "iPhone".to_string(), registered_at_ms: 1 })
        .unwrap();
    store
        .add_auth_device_token(AuthDeviceToken { token: "t2".to_string(), device_name: "iPad".to_string(), registered_at_ms: 2 })
        .unwrap();

    assert_eq!(store.get_auth_device_tokens().unwrap().len(), 2);
}

#[cfg(unix)]
#[test]
fn persisted_files_are_written_with_private_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::new(dir.path());
    store.update_config(serde_json::json!({})).unwrap();

    let mode = fs::metadata(store.config_path()).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
