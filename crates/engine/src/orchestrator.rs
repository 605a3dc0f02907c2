// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SessionOrchestrator: per-session lifecycle state — the activation lock
//! that keeps at most one turn in flight, the idle timer that stops a
//! quiet session, and the stop state machine — plus `resolveDecision`,
//! which turns an owner's answer into a learned rule and unparks the
//! waiting `checkToolCall`.
//!
//! Methods take a lock, mutate in-memory state, and return the
//! [`Effect`]s a runtime loop must execute (spawn/kill a backend, arm a
//! timer); wire delivery goes straight to the session's
//! [`crate::broadcaster::SessionBroadcaster`] instead of through an
//! effect, since both are synchronous and in-process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use warden_core::clock::{Clock, SystemClock};
use warden_core::decision::{DecisionAnswer, PendingDecisionId};
use warden_core::effect::Effect;
use warden_core::event::AgentEvent;
use warden_core::rule::{Decision, Provenance, ResponseScope, Rule, RuleId, Scope};
use warden_core::session::{Session, SessionId, SessionStatus, SessionUsage};
use warden_core::timer::TimerId;
use warden_core::workspace::WorkspaceId;
use warden_gate::GateService;
use warden_storage::{RuleStore, RuleStoreError};
use warden_wire::client::ServerMessage;

use crate::broadcaster::SessionBroadcaster;
use crate::live_activity::{LiveActivityBridge, LiveActivityUpdate};
use crate::translator::{translate, TurnContext};

/// Default idle window: a `ready` session with no activity this long is
/// stopped with `source: "timeout"`.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Longest an owner's learned-rule expiry may be extended by — caps an
/// `expires_in_ms` that would otherwise pin a rule beyond any reasonable
/// session lifetime.
const MAX_RULE_EXPIRY_MS: u64 = 365 * 24 * 60 * 60 * 1000;

/// Where a stop request originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSource {
    User,
    Timeout,
    Server,
}

impl StopSource {
    pub fn as_str(self) -> &'static str {
        match self {
            StopSource::User => "user",
            StopSource::Timeout => "timeout",
            StopSource::Server => "server",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("session {0} is already processing a turn")]
    AlreadyActive(SessionId),
    #[error("pending decision {0} not found")]
    DecisionNotFound(String),
    #[error("rule store error: {0}")]
    RuleStore(String),
}

impl From<RuleStoreError> for OrchestratorError {
    fn from(err: RuleStoreError) -> Self {
        OrchestratorError::RuleStore(err.to_string())
    }
}

struct SessionState {
    session: Session,
    active: bool,
    context: TurnContext,
}

/// Everything needed to start one session's agent backend, threaded
/// through from `create_session` into the `SpawnAgentBackend` effect.
#[derive(Debug, Clone)]
pub struct SessionStartConfig {
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub system_prompt: Option<String>,
    pub resume_uuid: Option<String>,
}

pub struct SessionOrchestrator<C: Clock = SystemClock> {
    gate: Arc<GateService<C>>,
    rule_store: Arc<RuleStore>,
    broadcaster: Arc<SessionBroadcaster>,
    live_activity: LiveActivityBridge,
    clock: C,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<SessionId, SessionState>>,
}

impl<C: Clock> SessionOrchestrator<C> {
    pub fn new(gate: Arc<GateService<C>>, rule_store: Arc<RuleStore>, broadcaster: Arc<SessionBroadcaster>, clock: C) -> Self {
        Self {
            gate,
            rule_store,
            broadcaster,
            live_activity: LiveActivityBridge::new(),
            clock,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Register a freshly created session and produce the effects that
    /// start it: spawning its agent backend and arming its idle timer.
    pub fn create_session(
        &self,
        workspace_id: WorkspaceId,
        model: impl Into<String>,
        name: impl Into<String>,
        start: SessionStartConfig,
    ) -> (Session, Vec<Effect>) {
        let now_ms = self.clock.epoch_ms();
        let mut session = Session::new(name.into(), model.into(), workspace_id);
        session.created_at_ms = now_ms;
        session.last_activity_ms = now_ms;

        let effects = vec![
            Effect::SpawnAgentBackend {
                session_id: session.id.clone(),
                workspace_id,
                model: session.model.clone(),
                cwd: start.cwd,
                env: start.env,
                system_prompt: start.system_prompt,
                resume_uuid: start.resume_uuid,
            },
            Effect::SetTimer { id: TimerId::idle(&session.id), duration: self.idle_timeout },
        ];

        self.sessions.lock().insert(
            session.id.clone(),
            SessionState { session: session.clone(), active: false, context: TurnContext::new() },
        );
        (session, effects)
    }

    pub fn session(&self, session_id: &SessionId) -> Option<Session> {
        self.sessions.lock().get(session_id).map(|s| s.session.clone())
    }

    /// Acquire a session's activation lock ahead of sending it a prompt.
    /// Fails with [`OrchestratorError::AlreadyActive`] if a turn is
    /// already in flight — the orchestrator never lets two prompts race
    /// on the same backend.
    pub fn begin_turn(&self, session_id: &SessionId) -> Result<Vec<Effect>, OrchestratorError> {
        let mut sessions = self.sessions.lock();
        let state = sessions.get_mut(session_id).ok_or_else(|| OrchestratorError::SessionNotFound(session_id.clone()))?;
        if state.active {
            return Err(OrchestratorError::AlreadyActive(session_id.clone()));
        }
        state.active = true;
        state.session.transition_to(SessionStatus::Busy);
        Ok(vec![Effect::CancelTimer { id: TimerId::idle(session_id) }])
    }

    /// Release a session's activation lock once its turn has ended.
    pub fn end_turn(&self, session_id: &SessionId) -> Result<Vec<Effect>, OrchestratorError> {
        let now_ms = self.clock.epoch_ms();
        let mut sessions = self.sessions.lock();
        let state = sessions.get_mut(session_id).ok_or_else(|| OrchestratorError::SessionNotFound(session_id.clone()))?;
        state.active = false;
        state.session.last_activity_ms = now_ms;
        state.session.transition_to(SessionStatus::Ready);
        Ok(vec![Effect::SetTimer { id: TimerId::idle(session_id), duration: self.idle_timeout }])
    }

    /// Translate one raw agent backend event, publish the resulting wire
    /// messages to the session's ring, fold any usage report into the
    /// session record, and return the effects the runtime must run.
    pub fn handle_agent_event(&self, session_id: &SessionId, event: AgentEvent) -> Result<Vec<Effect>, OrchestratorError> {
        let now_ms = self.clock.epoch_ms();
        let mut sessions = self.sessions.lock();
        let state = sessions.get_mut(session_id).ok_or_else(|| OrchestratorError::SessionNotFound(session_id.clone()))?;

        if let AgentEvent::Response { input_tokens, output_tokens, cache_read_tokens, cache_write_tokens, cost_micros, .. } = &event {
            apply_usage(&mut state.session.usage, *input_tokens, *output_tokens, *cache_read_tokens, *cache_write_tokens, *cost_micros);
        }
        state.session.last_activity_ms = now_ms;

        let status = state.session.status;
        let messages = translate(&mut state.context, session_id, event);
        let mut effects = vec![Effect::SetTimer { id: TimerId::idle(session_id), duration: self.idle_timeout }];
        let pending_permissions = || {
            self.gate.pending_decisions().iter().filter(|d| &d.session_id == session_id).count() as u32
        };
        for message in &messages {
            if let Some(update) = live_activity_update_for(message, pending_permissions) {
                if let Some(timer) = self.live_activity.update(session_id, update, status) {
                    effects.push(timer);
                }
            }
        }
        for message in messages {
            self.broadcaster.publish(session_id, message);
        }

        Ok(effects)
    }

    /// The Live Activity debounce timer fired: produce the coalesced push
    /// effect for whatever accumulated since the last flush, if anything
    /// did.
    pub fn flush_live_activity(&self, session_id: &SessionId) -> Vec<Effect> {
        self.live_activity.flush(session_id).into_iter().collect()
    }

    /// Begin the stop state machine: request a session's backend stop.
    /// Idempotent — a session already stopping or stopped produces no
    /// further effects.
    pub fn begin_stop(&self, session_id: &SessionId, source: StopSource) -> Result<Vec<Effect>, OrchestratorError> {
        let mut sessions = self.sessions.lock();
        let state = sessions.get_mut(session_id).ok_or_else(|| OrchestratorError::SessionNotFound(session_id.clone()))?;
        // `can_transition_to` treats same-state transitions as trivially
        // legal, so this must be checked explicitly rather than relying on
        // `transition_to`'s return value to guard re-entry.
        if matches!(state.session.status, SessionStatus::Stopping | SessionStatus::Stopped) {
            return Ok(Vec::new());
        }
        if !state.session.transition_to(SessionStatus::Stopping) {
            return Ok(Vec::new());
        }
        self.broadcaster.publish(
            session_id,
            ServerMessage::StopRequested { session_id: session_id.to_string(), source: source.as_str().to_string() },
        );
        Ok(vec![
            Effect::CancelTimer { id: TimerId::idle(session_id) },
            Effect::KillAgentBackend { session_id: session_id.clone() },
        ])
    }

    /// The backend acknowledged the stop request cleanly.
    pub fn confirm_stop(&self, session_id: &SessionId) -> Result<Vec<Effect>, OrchestratorError> {
        let mut sessions = self.sessions.lock();
        let state = sessions.get_mut(session_id).ok_or_else(|| OrchestratorError::SessionNotFound(session_id.clone()))?;
        state.session.transition_to(SessionStatus::Stopped);
        self.broadcaster.publish(session_id, ServerMessage::StopConfirmed { session_id: session_id.to_string() });
        Ok(self.end_live_activity(session_id, SessionStatus::Stopped, "stop_confirmed"))
    }

    /// The backend failed to stop (e.g. the kill signal itself errored).
    pub fn fail_stop(&self, session_id: &SessionId, reason: impl Into<String>) -> Result<Vec<Effect>, OrchestratorError> {
        let reason = reason.into();
        let mut sessions = self.sessions.lock();
        let state = sessions.get_mut(session_id).ok_or_else(|| OrchestratorError::SessionNotFound(session_id.clone()))?;
        state.session.transition_to(SessionStatus::Error);
        self.broadcaster.publish(session_id, ServerMessage::StopFailed { session_id: session_id.to_string(), reason });
        Ok(self.end_live_activity(session_id, SessionStatus::Error, "stop_failed"))
    }

    /// Tear a session down entirely: deny anything still parked at the
    /// gate, drop its replay ring, and remove it from the orchestrator.
    pub fn end_session(&self, session_id: &SessionId, reason: Option<String>) -> Vec<Effect> {
        self.gate.end_session(session_id);
        self.broadcaster.publish(session_id, ServerMessage::SessionEnded { session_id: session_id.to_string(), reason });
        let mut effects = self.end_live_activity(session_id, SessionStatus::Stopped, "session_ended");
        self.broadcaster.remove_session(session_id);
        self.sessions.lock().remove(session_id);
        effects.push(Effect::CancelTimer { id: TimerId::idle(session_id) });
        effects
    }

    /// Merge a terminal, sticky `end=true` update and flush immediately
    /// rather than waiting out the debounce window — a session winding
    /// down has nothing further to coalesce with.
    fn end_live_activity(&self, session_id: &SessionId, status: SessionStatus, last_event: &str) -> Vec<Effect> {
        self.live_activity.update(
            session_id,
            LiveActivityUpdate { status: Some(status), last_event: Some(last_event.to_string()), end: true, ..Default::default() },
            status,
        );
        self.live_activity.flush(session_id).into_iter().collect()
    }

    /// The idle timer fired: stop a `ready` session that's had no
    /// activity. A `busy` session cancels its idle timer on
    /// [`Self::begin_turn`], so this only ever fires while genuinely idle.
    pub fn on_idle_timeout(&self, session_id: &SessionId) -> Result<Vec<Effect>, OrchestratorError> {
        self.begin_stop(session_id, StopSource::Timeout)
    }

    /// Resolve a pending decision the owner answered: optionally learn a
    /// rule from it (per `scope`), then unpark the parked `checkToolCall`.
    pub fn resolve_decision(
        &self,
        id: &PendingDecisionId,
        answer: DecisionAnswer,
        scope: ResponseScope,
        expires_in_ms: Option<u64>,
    ) -> Result<Vec<Effect>, OrchestratorError> {
        let pending = self
            .gate
            .pending_decisions()
            .into_iter()
            .find(|d| &d.id == id)
            .ok_or_else(|| OrchestratorError::DecisionNotFound(id.to_string()))?;

        let mut learned_rule_id: Option<RuleId> = None;
        if let Some(rule_scope) = scope.to_rule_scope() {
            let now_ms = self.clock.epoch_ms();
            let candidate = derive_rule(&pending, answer.into(), rule_scope, expires_in_ms, now_ms);
            match self.rule_store.add(candidate) {
                Ok(rule) => learned_rule_id = Some(rule.id),
                // A conflicting rule already governs this shape; still
                // resolve the one decision in front of us, just without
                // recording a learned rule id.
                Err(RuleStoreError::Conflict(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        self.gate.resolve_decision(id, answer, learned_rule_id);
        Ok(vec![Effect::CancelTimer { id: TimerId::approval(id) }])
    }
}

/// Map one translated wire message onto the Live Activity merge it
/// implies, if any. `pending_permissions` is computed lazily since most
/// messages don't need it.
fn live_activity_update_for(message: &ServerMessage, pending_permissions: impl Fn() -> u32) -> Option<LiveActivityUpdate> {
    let mut update = LiveActivityUpdate::default();
    match message {
        ServerMessage::ToolStart { tool, .. } => {
            update.active_tool = Some(tool.clone());
            update.last_event = Some("tool_start".to_string());
        }
        ServerMessage::ToolEnd { .. } => {
            update.tool_finished = true;
            update.last_event = Some("tool_end".to_string());
        }
        ServerMessage::AgentStart { .. } => update.last_event = Some("agent_start".to_string()),
        ServerMessage::AgentEnd { .. } => update.last_event = Some("agent_end".to_string()),
        ServerMessage::MessageEnd { .. } => update.last_event = Some("message_end".to_string()),
        ServerMessage::PermissionRequest { .. } => {
            update.last_event = Some("permission_request".to_string());
            update.pending_permissions = Some(pending_permissions());
            update.priority = 1;
        }
        ServerMessage::PermissionExpired { .. } => {
            update.last_event = Some("permission_expired".to_string());
            update.pending_permissions = Some(pending_permissions());
        }
        ServerMessage::PermissionCancelled { .. } => {
            update.last_event = Some("permission_cancelled".to_string());
            update.pending_permissions = Some(pending_permissions());
        }
        ServerMessage::StopRequested { .. } => update.last_event = Some("stop_requested".to_string()),
        ServerMessage::StopConfirmed { .. } => {
            update.last_event = Some("stop_confirmed".to_string());
            update.end = true;
        }
        ServerMessage::StopFailed { .. } => {
            update.last_event = Some("stop_failed".to_string());
            update.end = true;
        }
        ServerMessage::SessionEnded { .. } => {
            update.last_event = Some("session_ended".to_string());
            update.end = true;
        }
        ServerMessage::Error { .. } => update.last_event = Some("error".to_string()),
        _ => return None,
    }
    Some(update)
}

fn apply_usage(
    usage: &mut SessionUsage,
    input_tokens: u64,
    output_tokens: u64,
    cache_read_tokens: u64,
    cache_write_tokens: u64,
    cost_micros: u64,
) {
    usage.message_count += 1;
    usage.input_tokens += input_tokens;
    usage.output_tokens += output_tokens;
    usage.cache_read_tokens += cache_read_tokens;
    usage.cache_write_tokens += cache_write_tokens;
    usage.cost_micros += cost_micros;
    usage.context_tokens = input_tokens + cache_read_tokens + cache_write_tokens;
}

/// Build the rule an owner's decision response implies, clamping its
/// expiry and deriving `executable`/`pattern` the same way the policy
/// engine itself would match them.
///
/// A bash command that fails to parse into exactly one simple command
/// (a chain, or something the lexer rejects) can't be reduced to a
/// single executable/pattern pair, so the learned rule falls back to
/// matching on `tool` and `scope` alone.
fn derive_rule(
    pending: &warden_core::decision::PendingDecision,
    decision: Decision,
    scope: Scope,
    expires_in_ms: Option<u64>,
    now_ms: u64,
) -> Rule {
    let (executable, pattern) = if pending.tool == "bash" {
        let command = pending.input.get("command").and_then(|v| v.as_str()).unwrap_or("");
        match warden_shell::split_simple_commands(command) {
            Ok(simple) if simple.len() == 1 => {
                let executable = warden_shell::leading_argv0(&simple[0]);
                (executable, Some(render_simple_command(&simple[0])))
            }
            _ => (None, None),
        }
    } else {
        let path = pending.input.get("path").and_then(|v| v.as_str()).map(warden_core::normalize_path_pattern);
        (None, path)
    };

    Rule {
        id: RuleId::new(),
        tool: pending.tool.clone(),
        decision,
        executable,
        pattern,
        scope,
        session_id: (scope == Scope::Session).then(|| pending.session_id.clone()),
        workspace_id: (scope != Scope::Global).then_some(pending.workspace_id),
        expires_at_ms: expires_in_ms.map(|ms| now_ms + ms.min(MAX_RULE_EXPIRY_MS)),
        provenance: Provenance::Learned,
        created_at_ms: now_ms,
    }
}

fn render_simple_command(simple: &warden_shell::SimpleCommand) -> String {
    let mut parts = Vec::new();
    if let Some(name) = warden_shell::word_literal(&simple.name) {
        parts.push(name);
    }
    for arg in &simple.args {
        parts.push(warden_shell::word_literal(arg).unwrap_or_default());
    }
    parts.join(" ")
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
