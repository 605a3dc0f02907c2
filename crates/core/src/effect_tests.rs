// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::workspace::WorkspaceId;
use std::time::Duration;

#[test]
fn set_timer_round_trips_duration_as_millis() {
    let effect = Effect::SetTimer { id: TimerId::from_string("tmr-x"), duration: Duration::from_secs(5) };
    let json = serde_json::to_value(&effect).unwrap();
    assert_eq!(json["SetTimer"]["duration"], 5000);
}

#[test]
fn spawn_agent_backend_fields_include_session_and_workspace() {
    let session_id = SessionId::new();
    let workspace_id = WorkspaceId::new();
    let effect = Effect::SpawnAgentBackend {
        session_id: session_id.clone(),
        workspace_id,
        model: "anthropic/claude-opus-4".to_string(),
        cwd: PathBuf::from("/work"),
        env: vec![],
        system_prompt: None,
        resume_uuid: None,
    };
    let fields = effect.fields();
    assert!(fields.contains(&("session_id", session_id.to_string())));
    assert_eq!(effect.name(), "spawn_agent_backend");
}

#[test]
fn frequent_effects_are_not_verbose() {
    assert!(!Effect::CancelTimer { id: TimerId::from_string("tmr-x") }.verbose());
    assert!(Effect::KillAgentBackend { session_id: SessionId::new() }.verbose());
}
