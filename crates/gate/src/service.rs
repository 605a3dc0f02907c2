// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GateService: the checkToolCall algorithm, independent of transport.
//!
//! `listener.rs` decodes NDJSON off a socket and calls into this; tests
//! drive it directly without a connection at all.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

use warden_core::audit::{AuditEntry, AuditId, ResolvedBy};
use warden_core::clock::{Clock, SystemClock};
use warden_core::decision::{DecisionAnswer, PendingDecision, PendingDecisionId};
use warden_core::guard::{Guard, GuardState};
use warden_core::rule::{Decision, RuleId};
use warden_core::session::SessionId;
use warden_core::workspace::WorkspaceId;
use warden_policy::CompiledPolicy;
use warden_storage::{AuditLog, RuleStore};
use warden_wire::gate::{GateDecision, GateRequest, GateResponse};

use crate::registry::{PendingDecisionRegistry, ResolutionOutcome};

/// Default approval window, per spec: 120s, 0 (here `None`) disables it.
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(120);

/// Tool names whose policy match text comes from `input.path` rather than
/// `input.command`.
const FILE_TOOLS: &[&str] = &["read", "write", "edit", "find", "ls"];

/// Whether some client is reachable to push an `approval_needed` to. When
/// nobody is reachable, an `ask` outcome trips the guard's fail-safe
/// instead of parking a decision nobody can ever answer.
pub trait OwnerReachability: Send + Sync {
    fn is_reachable(&self, session_id: &SessionId) -> bool;
}

pub struct AlwaysReachable;

impl OwnerReachability for AlwaysReachable {
    fn is_reachable(&self, _session_id: &SessionId) -> bool {
        true
    }
}

pub struct GateService<C: Clock = SystemClock> {
    rule_store: Arc<RuleStore>,
    policy: CompiledPolicy,
    audit_log: Arc<AuditLog>,
    registry: PendingDecisionRegistry,
    guards: Mutex<HashMap<SessionId, Guard>>,
    reachability: Arc<dyn OwnerReachability>,
    clock: C,
    approval_timeout: Option<Duration>,
}

impl<C: Clock> GateService<C> {
    pub fn new(
        rule_store: Arc<RuleStore>,
        policy: CompiledPolicy,
        audit_log: Arc<AuditLog>,
        reachability: Arc<dyn OwnerReachability>,
        clock: C,
    ) -> Self {
        Self {
            rule_store,
            policy,
            audit_log,
            registry: PendingDecisionRegistry::new(),
            guards: Mutex::new(HashMap::new()),
            reachability,
            clock,
            approval_timeout: Some(DEFAULT_APPROVAL_TIMEOUT),
        }
    }

    pub fn with_approval_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.approval_timeout = timeout;
        self
    }

    pub fn rule_store(&self) -> &RuleStore {
        &self.rule_store
    }

    /// Register a new session's guard (virtual guards pass `tcp_port: 0`).
    pub fn register_session(&self, session_id: SessionId, tcp_port: u16) {
        let now_ms = self.clock.epoch_ms();
        self.guards.lock().insert(session_id, Guard::new(tcp_port, now_ms));
    }

    /// `guard_ready`: the shim has connected.
    pub fn guard_ready(&self, session_id: &SessionId) {
        let now_ms = self.clock.epoch_ms();
        if let Some(guard) = self.guards.lock().get_mut(session_id) {
            guard.connect(now_ms);
        }
    }

    pub fn heartbeat(&self, session_id: &SessionId) {
        let now_ms = self.clock.epoch_ms();
        if let Some(guard) = self.guards.lock().get_mut(session_id) {
            guard.record_heartbeat(now_ms);
        }
    }

    /// Trip fail-safe for a session: lost heartbeat, closed TCP connection,
    /// or an `ask` outcome with nobody reachable. Denies every decision
    /// currently parked for the session.
    pub fn trip_fail_safe(&self, session_id: &SessionId, reason: &str) {
        let now_ms = self.clock.epoch_ms();
        if let Some(guard) = self.guards.lock().get_mut(session_id) {
            guard.trip_fail_safe(reason, now_ms);
        }
        for decision in self.registry.pending() {
            if &decision.session_id == session_id {
                self.registry.resolve(&decision.id, ResolutionOutcome::new(DecisionAnswer::Deny));
            }
        }
    }

    pub fn rearm(&self, session_id: &SessionId) {
        let now_ms = self.clock.epoch_ms();
        if let Some(guard) = self.guards.lock().get_mut(session_id) {
            guard.rearm(now_ms);
        }
    }

    pub fn guard_state(&self, session_id: &SessionId) -> Option<GuardState> {
        self.guards.lock().get(session_id).map(|g| g.state)
    }

    /// Resolve a parked decision with the owner's answer (routed in from
    /// the mobile client via `warden-engine`), recording any rule the
    /// owner's response scope caused to be learned.
    pub fn resolve_decision(
        &self,
        id: &PendingDecisionId,
        answer: DecisionAnswer,
        learned_rule_id: Option<RuleId>,
    ) -> bool {
        self.registry.resolve(id, ResolutionOutcome { answer, learned_rule_id })
    }

    pub fn pending_decisions(&self) -> Vec<PendingDecision> {
        self.registry.pending()
    }

    /// Session torn down: deny every decision still parked for it and
    /// drop any rule the owner taught during the session — session-scoped
    /// rules live only in memory and never outlive their session.
    pub fn end_session(&self, session_id: &SessionId) {
        self.trip_fail_safe(session_id, "Session ended");
        self.guards.lock().remove(session_id);
        self.rule_store.clear_session_rules(session_id);
    }

    /// The checkToolCall algorithm.
    pub async fn check_tool_call(
        &self,
        session_id: SessionId,
        workspace_id: WorkspaceId,
        request: GateRequest,
    ) -> GateResponse {
        let state = self.guard_state(&session_id).unwrap_or(GuardState::Unguarded);
        if !state.allows_evaluation() {
            return self.deny(session_id, workspace_id, request, "Guard is not ready", None, ResolvedBy::Policy);
        }

        if let Err(err) = self.rule_store.reload_if_changed() {
            warn!(error = %err, "rule store reload failed, evaluating against stale rules");
        }
        let rules = self.rule_store.rules_for(&session_id, &workspace_id);
        let now_ms = self.clock.epoch_ms();

        let outcome = if request.tool == "bash" {
            let command = request.input.get("command").and_then(|v| v.as_str()).unwrap_or("");
            warden_policy::evaluate_bash_command(&rules, &self.policy, &session_id, &workspace_id, command, now_ms)
        } else {
            let match_text = self.match_text(&request);
            let executable = None;
            warden_policy::evaluate_tool_call(
                &rules,
                &self.policy,
                &session_id,
                &workspace_id,
                &request.tool,
                executable,
                &match_text,
                now_ms,
            )
        };

        match outcome.decision {
            Decision::Allow => {
                self.resolve_immediately(session_id, workspace_id, request, Decision::Allow, outcome.matched_rule_id)
            }
            Decision::Deny => self.deny(
                session_id,
                workspace_id,
                request,
                "Denied by policy",
                outcome.matched_rule_id,
                ResolvedBy::Policy,
            ),
            Decision::Ask => self.ask(session_id, workspace_id, request).await,
        }
    }

    fn match_text(&self, request: &GateRequest) -> String {
        if FILE_TOOLS.contains(&request.tool.as_str()) {
            request.input.get("path").and_then(|v| v.as_str()).unwrap_or("").to_string()
        } else {
            request.input.to_string()
        }
    }

    fn resolve_immediately(
        &self,
        session_id: SessionId,
        workspace_id: WorkspaceId,
        request: GateRequest,
        decision: Decision,
        matched_rule_id: Option<String>,
    ) -> GateResponse {
        self.audit(&session_id, &workspace_id, &request, decision, ResolvedBy::Policy, matched_rule_id);
        GateResponse { tool_call_id: request.tool_call_id, decision: to_gate_decision(decision), reason: None }
    }

    fn deny(
        &self,
        session_id: SessionId,
        workspace_id: WorkspaceId,
        request: GateRequest,
        reason: &str,
        matched_rule_id: Option<String>,
        resolved_by: ResolvedBy,
    ) -> GateResponse {
        self.audit(&session_id, &workspace_id, &request, Decision::Deny, resolved_by, matched_rule_id);
        GateResponse {
            tool_call_id: request.tool_call_id,
            decision: GateDecision::Deny,
            reason: Some(reason.to_string()),
        }
    }

    async fn ask(&self, session_id: SessionId, workspace_id: WorkspaceId, request: GateRequest) -> GateResponse {
        if !self.reachability.is_reachable(&session_id) {
            self.trip_fail_safe(&session_id, "No client reachable to ask");
            return self.deny(
                session_id,
                workspace_id,
                request,
                "No client reachable to ask",
                None,
                ResolvedBy::Policy,
            );
        }

        let now_ms = self.clock.epoch_ms();
        let timeout_at_ms = self.approval_timeout.map(|d| now_ms + d.as_millis() as u64);
        let pending = PendingDecision {
            id: PendingDecisionId::new(),
            session_id: session_id.clone(),
            workspace_id: workspace_id.clone(),
            tool: request.tool.clone(),
            input: request.input.clone(),
            tool_call_id: request.tool_call_id.clone(),
            summary: summarize(&request),
            reason: "no matching rule".to_string(),
            created_at_ms: now_ms,
            timeout_at_ms,
        };
        let decision_id = pending.id.clone();
        let rx = self.registry.park(pending);

        let outcome = match self.approval_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) | Err(_) => {
                    self.registry.resolve(&decision_id, ResolutionOutcome::new(DecisionAnswer::Deny));
                    return self.deny(
                        session_id,
                        workspace_id,
                        request,
                        "Approval timeout",
                        None,
                        ResolvedBy::Timeout,
                    );
                }
            },
            None => match rx.await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return self.deny(
                        session_id,
                        workspace_id,
                        request,
                        "Extension connection lost",
                        None,
                        ResolvedBy::ExtensionLost,
                    )
                }
            },
        };

        let decision: Decision = outcome.answer.into();
        let learned_rule_id = outcome.learned_rule_id.map(|id| id.as_str().to_string());
        self.audit_with_learned_rule(&session_id, &workspace_id, &request, decision, ResolvedBy::User, None, learned_rule_id);
        GateResponse { tool_call_id: request.tool_call_id, decision: to_gate_decision(decision), reason: None }
    }

    fn audit(
        &self,
        session_id: &SessionId,
        workspace_id: &WorkspaceId,
        request: &GateRequest,
        decision: Decision,
        resolved_by: ResolvedBy,
        matched_rule_id: Option<String>,
    ) {
        self.audit_with_learned_rule(session_id, workspace_id, request, decision, resolved_by, matched_rule_id, None);
    }

    #[allow(clippy::too_many_arguments)]
    fn audit_with_learned_rule(
        &self,
        session_id: &SessionId,
        workspace_id: &WorkspaceId,
        request: &GateRequest,
        decision: Decision,
        resolved_by: ResolvedBy,
        matched_rule_id: Option<String>,
        learned_rule_id: Option<String>,
    ) {
        let entry = AuditEntry {
            id: AuditId::new(),
            session_id: session_id.clone(),
            workspace_id: *workspace_id,
            tool: request.tool.clone(),
            input: request.input.clone(),
            decision,
            resolved_by,
            matched_rule_id,
            learned_rule_id,
            created_at_ms: self.clock.epoch_ms(),
        };
        if let Err(err) = self.audit_log.append(&entry) {
            warn!(error = %err, "failed to append audit entry");
        }
    }
}

fn to_gate_decision(decision: Decision) -> GateDecision {
    match decision {
        Decision::Allow => GateDecision::Allow,
        Decision::Ask | Decision::Deny => GateDecision::Deny,
    }
}

fn summarize(request: &GateRequest) -> String {
    match request.input.get("command").and_then(|v| v.as_str()) {
        Some(command) => format!("{}: {command}", request.tool),
        None => match request.input.get("path").and_then(|v| v.as_str()) {
            Some(path) => format!("{}: {path}", request.tool),
            None => request.tool.clone(),
        },
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
