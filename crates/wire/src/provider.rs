// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AuthProxy provider routing table.
//!
//! The set of providers the AuthProxy fronts is small and closed (picked
//! from a handful of known upstream APIs), so a route is a plain data
//! record rather than a trait object — there is no provider-specific
//! behavior beyond which header carries the credential and which base URL
//! requests get forwarded to.

use serde::{Deserialize, Serialize};

/// Where a provider expects its credential: as a bearer token, or under a
/// vendor-specific header name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialPlacement {
    /// `Authorization: Bearer <token>`
    BearerAuthorization,
    /// A custom header, e.g. `x-api-key`.
    Header { name: String },
}

/// One entry in the AuthProxy's routing table: a path prefix, the upstream
/// it forwards to, and where the injected credential goes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderRoute {
    /// Route selector, e.g. `anthropic`, matched against the first path
    /// segment of an inbound request (`/anthropic/v1/messages`).
    pub provider: String,
    pub upstream_base_url: String,
    pub credential_placement: CredentialPlacement,
    /// Strip the `/<provider>` prefix before forwarding upstream.
    #[serde(default = "default_strip_prefix")]
    pub strip_prefix: bool,
}

fn default_strip_prefix() -> bool {
    true
}

impl ProviderRoute {
    /// Rewrite an inbound request path (`/anthropic/v1/messages`) into the
    /// path to forward upstream, returning `None` if it doesn't match this
    /// route's prefix.
    pub fn rewrite_path(&self, inbound_path: &str) -> Option<String> {
        let rest = inbound_path
            .strip_prefix('/')
            .unwrap_or(inbound_path)
            .strip_prefix(&self.provider)?;
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        if self.strip_prefix {
            Some(format!("{}/{}", self.upstream_base_url.trim_end_matches('/'), rest))
        } else {
            Some(format!("{}{}", self.upstream_base_url.trim_end_matches('/'), inbound_path))
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
