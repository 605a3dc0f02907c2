// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential resolution for the AuthProxy: implements
//! `warden-storage`'s [`CredentialResolver`] against the same fallback
//! chain the host CLI itself uses, so a session's agent backend and the
//! proxied upstream requests it triggers always authenticate the same way.
//!
//! ```text
//! Flow A — OAuth token (preferred):
//!   1. <PROVIDER>_OAUTH_TOKEN env var
//!   2. ~/.claude/.credentials.json -> claudeAiOauth.accessToken
//!
//! Flow B — API key (fallback):
//!   3. <PROVIDER>_API_KEY env var
//!   4. ~/.claude/.claude.json -> primaryApiKey
//! ```

use std::path::PathBuf;

use warden_core::credential::CredentialEntry;
use warden_storage::{CredentialResolver, CredentialStoreError};

/// Resolves provider credentials from environment variables and the host
/// CLI's own config files, in that order.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialResolver;

impl EnvCredentialResolver {
    pub fn new() -> Self {
        Self
    }

    fn claude_dir(&self) -> Option<PathBuf> {
        std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(".claude"))
    }

    fn read_oauth_token_file(&self) -> Option<String> {
        let path = self.claude_dir()?.join(".credentials.json");
        let content = std::fs::read_to_string(path).ok()?;
        let value: serde_json::Value = serde_json::from_str(&content).ok()?;
        value
            .get("claudeAiOauth")
            .and_then(|v| v.get("accessToken"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn read_api_key_file(&self) -> Option<String> {
        let path = self.claude_dir()?.join(".claude.json");
        let content = std::fs::read_to_string(path).ok()?;
        let value: serde_json::Value = serde_json::from_str(&content).ok()?;
        value.get("primaryApiKey").and_then(|v| v.as_str()).filter(|s| !s.is_empty()).map(str::to_string)
    }

    fn env_var(provider: &str, suffix: &str) -> Option<String> {
        let key = format!("{}_{suffix}", provider.to_uppercase());
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl CredentialResolver for EnvCredentialResolver {
    fn resolve(&self, provider: &str) -> Result<CredentialEntry, CredentialStoreError> {
        if let Some(token) = Self::env_var(provider, "OAUTH_TOKEN") {
            return Ok(CredentialEntry::OAuth { access_token: token, expires_at_ms: None });
        }
        if let Some(token) = self.read_oauth_token_file() {
            return Ok(CredentialEntry::OAuth { access_token: token, expires_at_ms: None });
        }
        if let Some(key) = Self::env_var(provider, "API_KEY") {
            return Ok(CredentialEntry::ApiKey { key });
        }
        if let Some(key) = self.read_api_key_file() {
            return Ok(CredentialEntry::ApiKey { key });
        }
        Err(CredentialStoreError::Unresolved(provider.to_string()))
    }
}

#[cfg(test)]
#[path = "credential_adapter_tests.rs"]
mod tests;
