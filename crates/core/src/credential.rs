// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider credential representation, shared by the credential store and
//! the auth proxy's request-signing path.

use serde::{Deserialize, Serialize};

/// A resolved credential for one provider, ready to be attached to an
/// upstream request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialEntry {
    OAuth {
        access_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expires_at_ms: Option<u64>,
    },
    ApiKey {
        key: String,
    },
}

impl CredentialEntry {
    /// Whether the credential is known to be expired as of `now_ms`.
    ///
    /// API keys never expire from the daemon's point of view; only OAuth
    /// tokens with a known expiry can be stale.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self {
            CredentialEntry::OAuth { expires_at_ms: Some(exp), .. } => *exp < now_ms,
            CredentialEntry::OAuth { expires_at_ms: None, .. } => false,
            CredentialEntry::ApiKey { .. } => false,
        }
    }

    /// The bearer value to send upstream, regardless of credential kind.
    pub fn bearer_value(&self) -> &str {
        match self {
            CredentialEntry::OAuth { access_token, .. } => access_token,
            CredentialEntry::ApiKey { key } => key,
        }
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
