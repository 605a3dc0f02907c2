// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document storage: the external collaborator the engine persists
//! server config, sessions, workspaces, transcripts, and device tokens
//! to. `config.json` / `sessions/<id>.json` / `workspaces/<id>.json` are
//! the file layout named explicitly; transcripts and device tokens get
//! their own sibling files under the same atomic-write-plus-private-mode
//! discipline.
//!
//! This is an out-of-scope external collaborator from the engine's point
//! of view: the engine only ever talks to the [`DocumentStore`] trait, so
//! swapping the file-backed reference implementation below for a remote
//! object store is an adapter change, not an engine change.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use warden_core::config::ServerConfig;
use warden_core::device_token::{AuthDeviceToken, PushDeviceToken};
use warden_core::message::SessionMessage;
use warden_core::session::{Session, SessionId};
use warden_core::workspace::{Workspace, WorkspaceId};

use crate::perms::{set_private_dir, set_private_file};

#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// `getConfig`/`updateConfig`/session/workspace/message/device-token
/// persistence for a single-owner host.
pub trait DocumentStore: Send + Sync {
    fn get_config(&self) -> Result<ServerConfig, DocumentStoreError>;
    fn update_config(&self, patch: serde_json::Value) -> Result<ServerConfig, DocumentStoreError>;

    fn get_session(&self, id: &SessionId) -> Result<Option<Session>, DocumentStoreError>;
    fn save_session(&self, session: &Session) -> Result<(), DocumentStoreError>;
    fn list_sessions(&self) -> Result<Vec<Session>, DocumentStoreError>;
    fn delete_session(&self, id: &SessionId) -> Result<(), DocumentStoreError>;

    fn get_workspace(&self, id: &WorkspaceId) -> Result<Option<Workspace>, DocumentStoreError>;
    fn save_workspace(&self, workspace: &Workspace) -> Result<(), DocumentStoreError>;
    fn list_workspaces(&self) -> Result<Vec<Workspace>, DocumentStoreError>;
    fn delete_workspace(&self, id: &WorkspaceId) -> Result<(), DocumentStoreError>;

    fn add_session_message(&self, message: &SessionMessage) -> Result<(), DocumentStoreError>;
    fn get_session_messages(&self, session_id: &SessionId) -> Result<Vec<SessionMessage>, DocumentStoreError>;

    fn get_push_device_tokens(&self) -> Result<Vec<PushDeviceToken>, DocumentStoreError>;
    fn add_push_device_token(&self, token: PushDeviceToken) -> Result<(), DocumentStoreError>;

    fn get_auth_device_tokens(&self) -> Result<Vec<AuthDeviceToken>, DocumentStoreError>;
    fn add_auth_device_token(&self, token: AuthDeviceToken) -> Result<(), DocumentStoreError>;
}

/// File-backed [`DocumentStore`] reference implementation. Good enough
/// for a single-owner host; not intended to survive concurrent writers
/// from multiple daemons.
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    fn session_path(&self, id: &SessionId) -> PathBuf {
        self.sessions_dir().join(format!("{id}.json"))
    }

    fn workspaces_dir(&self) -> PathBuf {
        self.root.join("workspaces")
    }

    fn workspace_path(&self, id: &WorkspaceId) -> PathBuf {
        self.workspaces_dir().join(format!("{id}.json"))
    }

    fn messages_dir(&self) -> PathBuf {
        self.root.join("messages")
    }

    fn messages_path(&self, session_id: &SessionId) -> PathBuf {
        self.messages_dir().join(format!("{session_id}.jsonl"))
    }

    fn device_tokens_dir(&self) -> PathBuf {
        self.root.join("device_tokens")
    }

    fn push_tokens_path(&self) -> PathBuf {
        self.device_tokens_dir().join("push.json")
    }

    fn auth_tokens_path(&self) -> PathBuf {
        self.device_tokens_dir().join("auth.json")
    }

    fn read_json<T: for<'de> serde::Deserialize<'de>>(path: &Path) -> Result<Option<T>, DocumentStoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<(), DocumentStoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
            set_private_dir(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        set_private_file(&tmp)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn list_dir_json<T: for<'de> serde::Deserialize<'de>>(dir: &Path) -> Result<Vec<T>, DocumentStoreError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<_> = fs::read_dir(dir)?.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        paths.sort();
        let mut values = Vec::new();
        for path in paths {
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(value) = Self::read_json(&path)? {
                values.push(value);
            }
        }
        Ok(values)
    }
}

impl DocumentStore for FileDocumentStore {
    fn get_config(&self) -> Result<ServerConfig, DocumentStoreError> {
        Ok(Self::read_json(&self.config_path())?.unwrap_or_default())
    }

    fn update_config(&self, patch: serde_json::Value) -> Result<ServerConfig, DocumentStoreError> {
        let mut config = self.get_config()?;
        config.merge_patch(patch)?;
        Self::write_json(&config, &self.config_path())?;
        Ok(config)
    }

    fn get_session(&self, id: &SessionId) -> Result<Option<Session>, DocumentStoreError> {
        Self::read_json(&self.session_path(id))
    }

    fn save_session(&self, session: &Session) -> Result<(), DocumentStoreError> {
        Self::write_json(session, &self.session_path(&session.id))
    }

    fn list_sessions(&self) -> Result<Vec<Session>, DocumentStoreError> {
        Self::list_dir_json(&self.sessions_dir())
    }

    fn delete_session(&self, id: &SessionId) -> Result<(), DocumentStoreError> {
        remove_if_present(&self.session_path(id))?;
        remove_if_present(&self.messages_path(id))
    }

    fn get_workspace(&self, id: &WorkspaceId) -> Result<Option<Workspace>, DocumentStoreError> {
        Self::read_json(&self.workspace_path(id))
    }

    fn save_workspace(&self, workspace: &Workspace) -> Result<(), DocumentStoreError> {
        Self::write_json(workspace, &self.workspace_path(&workspace.id))
    }

    fn list_workspaces(&self) -> Result<Vec<Workspace>, DocumentStoreError> {
        Self::list_dir_json(&self.workspaces_dir())
    }

    fn delete_workspace(&self, id: &WorkspaceId) -> Result<(), DocumentStoreError> {
        remove_if_present(&self.workspace_path(id))
    }

    fn add_session_message(&self, message: &SessionMessage) -> Result<(), DocumentStoreError> {
        let path = self.messages_path(&message.session_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
            set_private_dir(parent)?;
        }
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        use std::io::Write;
        let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(&line)?;
        file.flush()?;
        drop(file);
        set_private_file(&path)?;
        Ok(())
    }

    fn get_session_messages(&self, session_id: &SessionId) -> Result<Vec<SessionMessage>, DocumentStoreError> {
        let path = self.messages_path(session_id);
        match fs::read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .filter(|line| !line.is_empty())
                .map(|line| Ok(serde_json::from_str(line)?))
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn get_push_device_tokens(&self) -> Result<Vec<PushDeviceToken>, DocumentStoreError> {
        Ok(Self::read_json(&self.push_tokens_path())?.unwrap_or_default())
    }

    fn add_push_device_token(&self, token: PushDeviceToken) -> Result<(), DocumentStoreError> {
        let mut tokens = self.get_push_device_tokens()?;
        tokens.retain(|t| t.token != token.token);
        tokens.push(token);
        Self::write_json(&tokens, &self.push_tokens_path())
    }

    fn get_auth_device_tokens(&self) -> Result<Vec<AuthDeviceToken>, DocumentStoreError> {
        Ok(Self::read_json(&self.auth_tokens_path())?.unwrap_or_default())
    }

    fn add_auth_device_token(&self, token: AuthDeviceToken) -> Result<(), DocumentStoreError> {
        let mut tokens = self.get_auth_device_tokens()?;
        tokens.retain(|t| t.token != token.token);
        tokens.push(token);
        Self::write_json(&tokens, &self.auth_tokens_path())
    }
}

fn remove_if_present(path: &Path) -> Result<(), DocumentStoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "document_store_tests.rs"]
mod tests;
