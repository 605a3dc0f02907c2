// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tempfile::tempdir;
use warden_core::clock::FakeClock;
use warden_core::decision::DecisionAnswer;
use warden_core::event::AgentEvent;
use warden_core::rule::{Decision, ResponseScope};
use warden_core::session::SessionStatus;
use warden_core::workspace::WorkspaceId;
use warden_gate::{AlwaysReachable, GateService};
use warden_storage::{AuditLog, RuleStore};
use warden_wire::gate::{GateDecision, GateRequest};

use super::*;
use crate::broadcaster::SessionBroadcaster;

fn orchestrator(dir: &std::path::Path) -> SessionOrchestrator<FakeClock> {
    let rule_store = Arc::new(RuleStore::open(dir.join("rules.json")).unwrap());
    let audit_log = Arc::new(AuditLog::open(dir.join("audit.jsonl")).unwrap());
    let gate = Arc::new(
        GateService::new(
            rule_store.clone(),
            warden_policy::CompiledPolicy::from_default(),
            audit_log,
            Arc::new(AlwaysReachable),
            FakeClock::new(),
        )
        .with_approval_timeout(None),
    );
    let broadcaster = Arc::new(SessionBroadcaster::new());
    SessionOrchestrator::new(gate, rule_store, broadcaster, FakeClock::new())
}

fn start_config() -> SessionStartConfig {
    SessionStartConfig { cwd: std::env::temp_dir(), env: Vec::new(), system_prompt: None, resume_uuid: None }
}

#[test]
fn create_session_spawns_the_backend_and_arms_the_idle_timer() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let (session, effects) = orch.create_session(WorkspaceId::new(), "anthropic/claude-opus-4", "my session", start_config());

    assert!(matches!(&effects[0], Effect::SpawnAgentBackend { session_id, .. } if session_id == &session.id));
    assert!(matches!(&effects[1], Effect::SetTimer { id, .. } if id == &TimerId::idle(&session.id)));
    assert_eq!(orch.session(&session.id).unwrap().status, SessionStatus::Starting);
}

#[test]
fn begin_turn_on_an_unknown_session_errors() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let err = orch.begin_turn(&SessionId::new()).unwrap_err();
    assert!(matches!(err, OrchestratorError::SessionNotFound(_)));
}

#[test]
fn begin_turn_twice_without_ending_the_first_fails() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let (session, _) = orch.create_session(WorkspaceId::new(), "m", "s", start_config());

    orch.begin_turn(&session.id).unwrap();
    let err = orch.begin_turn(&session.id).unwrap_err();
    assert!(matches!(err, OrchestratorError::AlreadyActive(_)));
}

#[test]
fn end_turn_returns_the_session_to_ready_and_rearms_the_idle_timer() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let (session, _) = orch.create_session(WorkspaceId::new(), "m", "s", start_config());

    orch.begin_turn(&session.id).unwrap();
    assert_eq!(orch.session(&session.id).unwrap().status, SessionStatus::Busy);

    let effects = orch.end_turn(&session.id).unwrap();
    assert_eq!(orch.session(&session.id).unwrap().status, SessionStatus::Ready);
    assert!(matches!(&effects[0], Effect::SetTimer { id, .. } if id == &TimerId::idle(&session.id)));
}

#[test]
fn handle_agent_event_publishes_durable_messages_onto_the_session_ring() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let (session, _) = orch.create_session(WorkspaceId::new(), "m", "s", start_config());

    orch.handle_agent_event(&session.id, AgentEvent::AgentStart { backend_session_uuid: "be-1".to_string() }).unwrap();

    let catch_up = orch.broadcaster.get_catch_up(&session.id, 0);
    assert_eq!(catch_up.events.len(), 1);
    assert!(matches!(&catch_up.events[0].message, ServerMessage::AgentStart { .. }));
}

#[test]
fn handle_agent_event_arms_the_live_activity_debounce_then_flush_reports_the_tool() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let (session, _) = orch.create_session(WorkspaceId::new(), "m", "s", start_config());

    let effects = orch
        .handle_agent_event(
            &session.id,
            AgentEvent::ToolExecutionStart {
                tool_call_id: "tc-1".to_string(),
                tool: "bash".to_string(),
                input: serde_json::json!({"command": "ls"}),
            },
        )
        .unwrap();
    assert!(effects.iter().any(|e| matches!(e, Effect::SetTimer { id, .. } if id == &TimerId::debounce(&session.id))));

    let flushed = orch.flush_live_activity(&session.id);
    assert_eq!(flushed.len(), 1);
    match &flushed[0] {
        Effect::PushLiveActivity { active_tool, last_event, .. } => {
            assert_eq!(active_tool.as_deref(), Some("bash"));
            assert_eq!(last_event.as_deref(), Some("tool_start"));
        }
        other => panic!("expected PushLiveActivity, got {other:?}"),
    }

    // a second flush with nothing accumulated since reports nothing.
    assert!(orch.flush_live_activity(&session.id).is_empty());
}

#[test]
fn handle_agent_event_folds_response_usage_into_the_session_record() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let (session, _) = orch.create_session(WorkspaceId::new(), "m", "s", start_config());

    orch.handle_agent_event(
        &session.id,
        AgentEvent::Response {
            message_id: "m1".to_string(),
            input_tokens: 100,
            output_tokens: 50,
            cache_read_tokens: 10,
            cache_write_tokens: 5,
            cost_micros: 1234,
        },
    )
    .unwrap();

    let usage = orch.session(&session.id).unwrap().usage;
    assert_eq!(usage.input_tokens, 100);
    assert_eq!(usage.output_tokens, 50);
    assert_eq!(usage.cost_micros, 1234);
    assert_eq!(usage.message_count, 1);
}

#[test]
fn begin_stop_is_idempotent_once_already_stopping() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let (session, _) = orch.create_session(WorkspaceId::new(), "m", "s", start_config());
    orch.end_turn(&session.id).unwrap();

    let first = orch.begin_stop(&session.id, StopSource::User).unwrap();
    assert_eq!(first.len(), 2);
    let second = orch.begin_stop(&session.id, StopSource::Timeout).unwrap();
    assert!(second.is_empty());
}

#[test]
fn confirm_stop_transitions_the_session_to_stopped() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let (session, _) = orch.create_session(WorkspaceId::new(), "m", "s", start_config());
    orch.end_turn(&session.id).unwrap();
    orch.begin_stop(&session.id, StopSource::User).unwrap();

    let effects = orch.confirm_stop(&session.id).unwrap();
    assert_eq!(orch.session(&session.id).unwrap().status, SessionStatus::Stopped);
    assert!(effects.iter().any(|e| matches!(e, Effect::PushLiveActivity { end: true, .. })));
}

#[test]
fn fail_stop_transitions_the_session_to_error() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let (session, _) = orch.create_session(WorkspaceId::new(), "m", "s", start_config());
    orch.end_turn(&session.id).unwrap();
    orch.begin_stop(&session.id, StopSource::User).unwrap();

    orch.fail_stop(&session.id, "backend wedged").unwrap();
    assert_eq!(orch.session(&session.id).unwrap().status, SessionStatus::Error);
}

#[test]
fn end_session_removes_it_from_the_orchestrator_and_its_ring() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let (session, _) = orch.create_session(WorkspaceId::new(), "m", "s", start_config());

    orch.end_session(&session.id, Some("done".to_string()));
    assert!(orch.session(&session.id).is_none());
}

#[tokio::test]
async fn resolve_decision_at_workspace_scope_learns_a_rule_and_unparks_the_check() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let workspace_id = WorkspaceId::new();
    let (session, _) = orch.create_session(workspace_id, "m", "s", start_config());
    let session_id = session.id.clone();

    let gate = orch.gate.clone();
    let check = tokio::spawn(async move {
        gate.register_session(session_id.clone(), 4001);
        gate.guard_ready(&session_id);
        gate.check_tool_call(
            session_id,
            workspace_id,
            GateRequest {
                session_id: "irrelevant".to_string(),
                tool_call_id: "tc-1".to_string(),
                tool: "bash".to_string(),
                input: serde_json::json!({"command": "rm important.txt"}),
            },
        )
        .await
    });

    let pending = loop {
        let pending = orch.gate.pending_decisions();
        if let Some(p) = pending.into_iter().next() {
            break p;
        }
        tokio::task::yield_now().await;
    };

    let effects = orch
        .resolve_decision(&pending.id, DecisionAnswer::Allow, ResponseScope::Workspace, Some(3_600_000))
        .unwrap();
    assert_eq!(effects.len(), 1);

    let response = check.await.unwrap();
    assert_eq!(response.decision, GateDecision::Allow);

    let rules = orch.rule_store.get_all();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].decision, Decision::Allow);
    assert_eq!(rules[0].executable.as_deref(), Some("rm"));
    assert_eq!(rules[0].workspace_id, Some(session.workspace_id));
}

#[tokio::test]
async fn resolve_decision_with_once_scope_never_learns_a_rule() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let workspace_id = WorkspaceId::new();
    let (session, _) = orch.create_session(workspace_id, "m", "s", start_config());
    let session_id = session.id.clone();

    let gate = orch.gate.clone();
    let check = tokio::spawn(async move {
        gate.register_session(session_id.clone(), 4001);
        gate.guard_ready(&session_id);
        gate.check_tool_call(
            session_id,
            workspace_id,
            GateRequest {
                session_id: "irrelevant".to_string(),
                tool_call_id: "tc-1".to_string(),
                tool: "bash".to_string(),
                input: serde_json::json!({"command": "rm once.txt"}),
            },
        )
        .await
    });

    let pending = loop {
        let pending = orch.gate.pending_decisions();
        if let Some(p) = pending.into_iter().next() {
            break p;
        }
        tokio::task::yield_now().await;
    };

    orch.resolve_decision(&pending.id, DecisionAnswer::Deny, ResponseScope::Once, None).unwrap();
    let response = check.await.unwrap();
    assert_eq!(response.decision, GateDecision::Deny);
    assert!(orch.rule_store.get_all().is_empty());
}

#[test]
fn resolve_decision_for_an_unknown_id_errors() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(dir.path());
    let err = orch
        .resolve_decision(&warden_core::decision::PendingDecisionId::new(), DecisionAnswer::Allow, ResponseScope::Once, None)
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::DecisionNotFound(_)));
}
