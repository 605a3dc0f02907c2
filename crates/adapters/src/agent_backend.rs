// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent backend adapter: the boundary between a supervised session and
//! whatever process actually runs the agent. `warden-engine` depends only
//! on [`AgentBackend`]; swapping the process-based implementation below
//! for a containerized or remote one is an adapter change, not an engine
//! change.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use warden_core::event::AgentEvent;
use warden_core::session::SessionId;

#[derive(Debug, Error)]
pub enum AgentBackendError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session {0} has no running backend")]
    NotRunning(SessionId),
    #[error("session {0} already has a running backend")]
    AlreadyRunning(SessionId),
}

/// Everything needed to start one session's agent backend.
#[derive(Debug, Clone)]
pub struct AgentSpawnConfig {
    pub session_id: SessionId,
    pub cwd: PathBuf,
    pub model: String,
    pub env: HashMap<String, String>,
    pub system_prompt: Option<String>,
    /// Backend-native session id to resume, if this is a reconnect after a
    /// daemon restart rather than a fresh session.
    pub resume_uuid: Option<String>,
}

/// Spawns and supervises agent backend processes.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Start a backend for `config.session_id`, streaming its
    /// [`AgentEvent`]s onto `events` until the process exits.
    async fn spawn(
        &self,
        config: AgentSpawnConfig,
        events: mpsc::Sender<AgentEvent>,
    ) -> Result<(), AgentBackendError>;

    /// Send a chat message into a running session's backend.
    async fn send_input(&self, session_id: &SessionId, text: &str) -> Result<(), AgentBackendError>;

    /// Terminate a running session's backend.
    async fn kill(&self, session_id: &SessionId) -> Result<(), AgentBackendError>;
}

struct RunningAgent {
    child: Child,
    stdin: tokio::process::ChildStdin,
}

/// [`AgentBackend`] that runs each session as a subprocess, speaking
/// newline-delimited JSON on stdin/stdout — the same framing
/// `warden-wire`'s [`warden_wire::gate`] module uses for the Gate's
/// permission hook, chosen here for the same reason: many messages over
/// one long-lived pipe.
pub struct ProcessAgentBackend {
    command: PathBuf,
    extra_args: Vec<String>,
    agents: Arc<Mutex<HashMap<SessionId, RunningAgent>>>,
}

impl ProcessAgentBackend {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self { command: command.into(), extra_args: Vec::new(), agents: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

#[async_trait]
impl AgentBackend for ProcessAgentBackend {
    async fn spawn(
        &self,
        config: AgentSpawnConfig,
        events: mpsc::Sender<AgentEvent>,
    ) -> Result<(), AgentBackendError> {
        if self.agents.lock().await.contains_key(&config.session_id) {
            return Err(AgentBackendError::AlreadyRunning(config.session_id));
        }

        let mut command = Command::new(&self.command);
        command
            .current_dir(&config.cwd)
            .args(&self.extra_args)
            .arg("--model")
            .arg(&config.model)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(prompt) = &config.system_prompt {
            command.arg("--system-prompt").arg(prompt);
        }
        if let Some(uuid) = &config.resume_uuid {
            command.arg("--resume").arg(uuid);
        }

        let mut child = command.spawn()?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        let session_id = config.session_id.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<AgentEvent>(&line) {
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(session_id = %session_id, %error, "unparseable agent backend line");
                    }
                }
            }
        });

        self.agents.lock().await.insert(config.session_id, RunningAgent { child, stdin });
        Ok(())
    }

    async fn send_input(&self, session_id: &SessionId, text: &str) -> Result<(), AgentBackendError> {
        use tokio::io::AsyncWriteExt;
        let mut line = text.to_string();
        line.push('\n');
        let mut agents = self.agents.lock().await;
        let agent =
            agents.get_mut(session_id).ok_or_else(|| AgentBackendError::NotRunning(session_id.clone()))?;
        agent.stdin.write_all(line.as_bytes()).await.map_err(AgentBackendError::Io)
    }

    async fn kill(&self, session_id: &SessionId) -> Result<(), AgentBackendError> {
        let mut agent = self
            .agents
            .lock()
            .await
            .remove(session_id)
            .ok_or_else(|| AgentBackendError::NotRunning(session_id.clone()))?;
        agent.child.start_kill()?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex as SyncMutex;

    /// In-memory [`AgentBackend`] for engine tests: records spawn/kill calls
    /// and lets the test push [`AgentEvent`]s directly onto the channel the
    /// engine is consuming.
    #[derive(Clone, Default)]
    pub struct FakeAgentBackend {
        spawned: Arc<SyncMutex<Vec<SessionId>>>,
        killed: Arc<SyncMutex<Vec<SessionId>>>,
        sent_input: Arc<SyncMutex<Vec<(SessionId, String)>>>,
    }

    impl FakeAgentBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn spawned(&self) -> Vec<SessionId> {
            self.spawned.lock().clone()
        }

        pub fn killed(&self) -> Vec<SessionId> {
            self.killed.lock().clone()
        }

        pub fn sent_input(&self) -> Vec<(SessionId, String)> {
            self.sent_input.lock().clone()
        }
    }

    #[async_trait]
    impl AgentBackend for FakeAgentBackend {
        async fn spawn(
            &self,
            config: AgentSpawnConfig,
            _events: mpsc::Sender<AgentEvent>,
        ) -> Result<(), AgentBackendError> {
            self.spawned.lock().push(config.session_id);
            Ok(())
        }

        async fn send_input(&self, session_id: &SessionId, text: &str) -> Result<(), AgentBackendError> {
            self.sent_input.lock().push((session_id.clone(), text.to_string()));
            Ok(())
        }

        async fn kill(&self, session_id: &SessionId) -> Result<(), AgentBackendError> {
            self.killed.lock().push(session_id.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAgentBackend;

#[cfg(test)]
#[path = "agent_backend_tests.rs"]
mod tests;
