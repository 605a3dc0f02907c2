// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon: wires the gate, orchestrator, and storage layers together and
//! runs the effect-execution loop — the single place that turns an
//! [`Effect`] returned by `warden-gate`/`warden-engine` into a spawned
//! process, an armed timer, or a delivered push notification.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use warden_adapters::agent_backend::{AgentBackend, AgentSpawnConfig};
use warden_adapters::push_sink::{PushNotification, PushSink};
use warden_core::clock::SystemClock;
use warden_core::effect::Effect;
use warden_core::event::AgentEvent;
use warden_core::session::SessionId;
use warden_core::timer::{TimerId, TimerKind};
use warden_engine::broadcaster::SessionBroadcaster;
use warden_engine::orchestrator::SessionOrchestrator;
use warden_gate::{AlwaysReachable, GateService};
use warden_storage::{AuditLog, CredentialStore, DocumentStore, RuleStore};
use warden_wire::control::{SessionSummary, StatusReport};

use crate::config::Config;
use crate::timers::TimerWheel;

#[derive(Debug, thiserror::Error)]
pub enum CreateSessionError {
    #[error("workspace not found")]
    WorkspaceNotFound,
    #[error("document store error: {0}")]
    Document(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("orchestrator error: {0}")]
    Orchestrator(String),
    #[error("agent backend error: {0}")]
    Backend(String),
}

/// Everything the daemon's binary needs to start the network listeners
/// and keep the effect loop running.
pub struct Daemon {
    pub config: Config,
    pub gate: Arc<GateService<SystemClock>>,
    pub orchestrator: Arc<SessionOrchestrator<SystemClock>>,
    pub broadcaster: Arc<SessionBroadcaster>,
    pub rule_store: Arc<RuleStore>,
    pub audit_log: Arc<AuditLog>,
    pub documents: Arc<dyn DocumentStore>,
    pub credentials: Arc<CredentialStore<SystemClock>>,
    push_sink: Arc<dyn PushSink>,
    agent_backend: Arc<dyn AgentBackend>,
    timers: Arc<TimerWheel>,
    event_tx: mpsc::Sender<(SessionId, AgentEvent)>,
    started_at_ms: std::time::Instant,
    /// Gate is per-session, not a single fixed port; reported as 0 until
    /// the control protocol grows a per-session breakdown.
    gate_port: AtomicU16,
    stream_mux_port: AtomicU16,
    auth_proxy_port: AtomicU16,
}

impl Daemon {
    /// Build every in-process collaborator and return the daemon along
    /// with the channels the runtime loop must drive: fired timer ids,
    /// and raw events forwarded from running agent backends.
    pub fn new(
        config: Config,
        agent_backend: Arc<dyn AgentBackend>,
        push_sink: Arc<dyn PushSink>,
    ) -> Result<(Arc<Self>, mpsc::Receiver<TimerId>, mpsc::Receiver<(SessionId, AgentEvent)>), io::Error> {
        let rule_store = Arc::new(
            RuleStore::open(&config.rules_path)
                .map_err(|err| io::Error::other(err.to_string()))?,
        );
        let audit_log = Arc::new(
            AuditLog::open(&config.audit_log_path)
                .map_err(|err| io::Error::other(err.to_string()))?,
        );
        let documents: Arc<dyn DocumentStore> =
            Arc::new(warden_storage::document_store::FileDocumentStore::new(&config.documents_dir));
        let credentials = Arc::new(CredentialStore::new(
            Box::new(warden_adapters::credential_adapter::EnvCredentialResolver::new()),
            SystemClock,
        ));

        let policy_config = match std::fs::read_to_string(&config.policy_config_path) {
            Ok(contents) => {
                let parsed = warden_policy::PolicyConfig::parse(&contents).map_err(io::Error::other)?;
                parsed.validate().map_err(io::Error::other)?;
                parsed
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => warden_policy::PolicyConfig::default_config(),
            Err(err) => return Err(err),
        };
        let policy = warden_policy::CompiledPolicy::compile(&policy_config);

        let gate = Arc::new(GateService::new(
            rule_store.clone(),
            policy,
            audit_log.clone(),
            Arc::new(AlwaysReachable),
            SystemClock,
        ));
        let broadcaster = Arc::new(SessionBroadcaster::new());
        let orchestrator =
            Arc::new(SessionOrchestrator::new(gate.clone(), rule_store.clone(), broadcaster.clone(), SystemClock));

        let (timers, timer_rx) = TimerWheel::new();
        let (event_tx, event_rx) = mpsc::channel(1024);

        let daemon = Arc::new(Self {
            config,
            gate,
            orchestrator,
            broadcaster,
            rule_store,
            audit_log,
            documents,
            credentials,
            push_sink,
            agent_backend,
            timers: Arc::new(timers),
            event_tx,
            started_at_ms: std::time::Instant::now(),
            gate_port: AtomicU16::new(0),
            stream_mux_port: AtomicU16::new(0),
            auth_proxy_port: AtomicU16::new(0),
        });

        Ok((daemon, timer_rx, event_rx))
    }

    pub fn set_stream_mux_port(&self, port: u16) {
        self.stream_mux_port.store(port, Ordering::Relaxed);
    }

    pub fn set_auth_proxy_port(&self, port: u16) {
        self.auth_proxy_port.store(port, Ordering::Relaxed);
    }

    pub fn status_report(&self) -> StatusReport {
        let sessions = self
            .documents
            .list_sessions()
            .unwrap_or_default()
            .into_iter()
            .map(|s| SessionSummary {
                session_id: s.id.to_string(),
                name: s.name,
                status: s.status.to_string(),
                workspace_id: s.workspace_id.to_string(),
            })
            .collect();
        StatusReport {
            daemon_version: crate::env::PROTOCOL_VERSION.to_string(),
            uptime_ms: self.started_at_ms.elapsed().as_millis() as u64,
            gate_port: self.gate_port.load(Ordering::Relaxed),
            stream_mux_port: self.stream_mux_port.load(Ordering::Relaxed),
            auth_proxy_port: self.auth_proxy_port.load(Ordering::Relaxed),
            sessions,
        }
    }

    pub fn tail_log(&self, lines: usize) -> io::Result<Vec<String>> {
        let contents = std::fs::read_to_string(&self.config.log_path).unwrap_or_default();
        Ok(contents.lines().rev().take(lines).map(str::to_string).rev().collect())
    }

    /// Create a session against a known workspace: binds its gate,
    /// persists the session record, and spawns its agent backend.
    pub async fn create_session(
        &self,
        workspace_id: warden_core::workspace::WorkspaceId,
        model: String,
        name: Option<String>,
        shutdown: CancellationToken,
    ) -> Result<warden_core::session::Session, CreateSessionError> {
        let workspace = self
            .documents
            .get_workspace(&workspace_id)
            .map_err(|err| CreateSessionError::Document(err.to_string()))?
            .ok_or(CreateSessionError::WorkspaceNotFound)?;

        let start = warden_engine::orchestrator::SessionStartConfig {
            cwd: workspace.host_dir.clone().unwrap_or_else(std::env::temp_dir),
            env: Vec::new(),
            system_prompt: workspace.system_prompt.clone(),
            resume_uuid: None,
        };
        let model = if model.is_empty() { workspace.default_model.clone().unwrap_or(model) } else { model };
        let (session, mut effects) =
            self.orchestrator.create_session(workspace_id, model, name.unwrap_or_default(), start);

        let gate_port = crate::gate_supervisor::spawn_for_session(
            self.gate.clone(),
            session.id.clone(),
            workspace_id,
            shutdown,
        )
        .await
        .map_err(CreateSessionError::Io)?;

        for effect in &mut effects {
            if let Effect::SpawnAgentBackend { env, .. } = effect {
                env.push(("WARDEN_GATE_PORT".to_string(), gate_port.to_string()));
            }
        }

        self.documents
            .save_session(&session)
            .map_err(|err| CreateSessionError::Document(err.to_string()))?;
        self.apply_effects(effects).await;
        Ok(session)
    }

    /// Relay a chat message into a session's running backend.
    pub async fn prompt(&self, session_id: &SessionId, text: &str) -> Result<(), PromptError> {
        let effects = self.orchestrator.begin_turn(session_id).map_err(|err| PromptError::Orchestrator(err.to_string()))?;
        self.apply_effects(effects).await;
        self.agent_backend.send_input(session_id, text).await.map_err(|err| PromptError::Backend(err.to_string()))
    }

    /// Release a session's turn lock without killing its backend. The
    /// backend itself has no mid-turn cancel signal in this adapter; a
    /// future backend can wire a real abort through the same effect.
    pub async fn abort(&self, session_id: &SessionId) -> Result<(), PromptError> {
        let effects = self.orchestrator.end_turn(session_id).map_err(|err| PromptError::Orchestrator(err.to_string()))?;
        self.apply_effects(effects).await;
        Ok(())
    }

    pub async fn stop_session(
        &self,
        session_id: &SessionId,
        source: warden_engine::orchestrator::StopSource,
    ) -> Result<(), PromptError> {
        let effects =
            self.orchestrator.begin_stop(session_id, source).map_err(|err| PromptError::Orchestrator(err.to_string()))?;
        self.apply_effects(effects).await;
        Ok(())
    }

    pub fn rearm_guard(&self, session_id: &SessionId) {
        self.gate.rearm(session_id);
    }

    pub async fn resolve_decision(
        &self,
        decision_id: &warden_core::decision::PendingDecisionId,
        answer: warden_core::decision::DecisionAnswer,
        scope: warden_core::rule::ResponseScope,
        expires_in_ms: Option<u64>,
    ) -> Result<(), PromptError> {
        let effects = self
            .orchestrator
            .resolve_decision(decision_id, answer, scope, expires_in_ms)
            .map_err(|err| PromptError::Orchestrator(err.to_string()))?;
        self.apply_effects(effects).await;
        Ok(())
    }

    /// End a session entirely, denying anything still parked at its gate.
    pub async fn end_session(&self, session_id: &SessionId, reason: Option<String>) {
        let effects = self.orchestrator.end_session(session_id, reason);
        let _ = self.documents.delete_session(session_id);
        self.apply_effects(effects).await;
    }

    /// Start a freshly created session's backend process.
    pub async fn spawn_agent_backend(
        &self,
        session_id: SessionId,
        cwd: std::path::PathBuf,
        model: String,
        env: Vec<(String, String)>,
        system_prompt: Option<String>,
        resume_uuid: Option<String>,
    ) {
        let (tx, mut rx) = mpsc::channel(256);
        let config = AgentSpawnConfig {
            session_id: session_id.clone(),
            cwd,
            model,
            env: env.into_iter().collect(),
            system_prompt,
            resume_uuid,
        };
        if let Err(err) = self.agent_backend.spawn(config, tx).await {
            warn!(%session_id, error = %err, "failed to spawn agent backend");
            return;
        }

        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if event_tx.send((session_id.clone(), event)).await.is_err() {
                    break;
                }
            }
        });
    }

    /// Execute one batch of effects returned by a gate/orchestrator call.
    pub async fn apply_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.apply_effect(effect).await;
        }
    }

    async fn apply_effect(&self, effect: Effect) {
        match effect {
            Effect::SpawnAgentBackend { session_id, model, cwd, env, system_prompt, resume_uuid, .. } => {
                self.spawn_agent_backend(session_id, cwd, model, env, system_prompt, resume_uuid).await;
            }
            Effect::KillAgentBackend { session_id } => {
                if let Err(err) = self.agent_backend.kill(&session_id).await {
                    warn!(%session_id, error = %err, "failed to kill agent backend");
                }
            }
            Effect::RespondToToolCall { .. } => {
                // The gate answers tool calls synchronously over its own
                // connection; nothing in this daemon currently emits this
                // effect, but it's matched here so new callers are free to.
            }
            Effect::SetTimer { id, duration } => self.timers.set(id, duration),
            Effect::CancelTimer { id } => self.timers.cancel(&id),
            Effect::Emit { .. } => {}
            Effect::PushPermission { decision_id, session_id, summary } => {
                let notification = PushNotification::Permission {
                    decision_id: decision_id.to_string(),
                    session_id: session_id.to_string(),
                    summary,
                };
                if let Err(err) = self.push_sink.send(notification).await {
                    warn!(%session_id, error = %err, "push delivery failed");
                }
            }
            Effect::PushSessionEvent { .. } => {}
            Effect::PushLiveActivity {
                session_id,
                status,
                active_tool,
                pending_permissions,
                last_event,
                elapsed_seconds,
                end,
            } => {
                let notification = PushNotification::LiveActivity {
                    session_id: session_id.to_string(),
                    status,
                    active_tool,
                    pending_permissions,
                    last_event,
                    elapsed_seconds,
                    end,
                };
                if let Err(err) = self.push_sink.send(notification).await {
                    warn!(%session_id, error = %err, "push delivery failed");
                }
            }
        }
    }

    /// A timer fired: translate it back into the orchestrator call it
    /// represents.
    pub async fn handle_timer_fired(&self, id: TimerId) {
        let Some(kind) = id.kind() else {
            warn!(timer_id = %id, "unrecognized timer id fired");
            return;
        };
        let effects = match kind {
            TimerKind::Idle(session_id) => self.orchestrator.on_idle_timeout(&session_id),
            TimerKind::Debounce(session_id) => Ok(self.orchestrator.flush_live_activity(&session_id)),
            TimerKind::Heartbeat(_) | TimerKind::Approval(_) => Ok(Vec::new()),
        };
        match effects {
            Ok(effects) => self.apply_effects(effects).await,
            Err(err) => warn!(error = %err, "timer handling failed"),
        }
    }

    /// An agent backend emitted an event: translate, publish, and execute
    /// the resulting effects.
    pub async fn handle_agent_event(&self, session_id: SessionId, event: AgentEvent) {
        match self.orchestrator.handle_agent_event(&session_id, event) {
            Ok(effects) => self.apply_effects(effects).await,
            Err(err) => warn!(%session_id, error = %err, "agent event handling failed"),
        }
    }

    /// Drive the timer-fired and agent-event channels until `shutdown`
    /// fires.
    pub async fn run_effect_loop(
        self: Arc<Self>,
        mut timer_rx: mpsc::Receiver<TimerId>,
        mut event_rx: mpsc::Receiver<(SessionId, AgentEvent)>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                Some(id) = timer_rx.recv() => self.handle_timer_fired(id).await,
                Some((session_id, event)) = event_rx.recv() => self.handle_agent_event(session_id, event).await,
                _ = shutdown.cancelled() => break,
                else => break,
            }
        }
        info!("effect loop stopped");
    }

    /// Drain period on shutdown: give in-flight stops this long to
    /// confirm before the process exits anyway.
    pub fn drain_timeout(&self) -> Duration {
        crate::env::drain_timeout()
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
