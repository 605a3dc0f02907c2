// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential cache in front of whatever actually resolves a provider's
//! credential (env var, OS keychain, config file — see `warden-adapters`).
//!
//! Resolution can be slow (a keychain prompt, a file stat) and every
//! proxied request needs a credential, so results are cached for a short
//! TTL rather than re-resolved per request. Five seconds is short enough
//! that a rotated credential is picked up almost immediately, and long
//! enough to absorb a burst of requests on the same connection.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use warden_core::clock::Clock;
use warden_core::credential::CredentialEntry;

const DEFAULT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("no credential configured for provider '{0}'")]
    Unresolved(String),
}

/// Resolves a provider's credential from wherever it actually lives.
/// Implemented by `warden-adapters`; this crate only caches the result.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self, provider: &str) -> Result<CredentialEntry, CredentialStoreError>;
}

struct CacheEntry {
    credential: CredentialEntry,
    cached_at_ms: u64,
}

/// TTL-caching wrapper around a [`CredentialResolver`].
pub struct CredentialStore<C: Clock> {
    resolver: Box<dyn CredentialResolver>,
    clock: C,
    ttl: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl<C: Clock> CredentialStore<C> {
    pub fn new(resolver: Box<dyn CredentialResolver>, clock: C) -> Self {
        Self::with_ttl(resolver, clock, DEFAULT_TTL)
    }

    pub fn with_ttl(resolver: Box<dyn CredentialResolver>, clock: C, ttl: Duration) -> Self {
        Self { resolver, clock, ttl, cache: Mutex::new(HashMap::new()) }
    }

    /// Resolve `provider`'s credential, serving from cache when the last
    /// resolution is still within the TTL and the credential itself isn't
    /// expired.
    pub fn get(&self, provider: &str) -> Result<CredentialEntry, CredentialStoreError> {
        let now_ms = self.clock.epoch_ms();
        {
            let cache = self.cache.lock();
            if let Some(entry) = cache.get(provider) {
                let age_ms = now_ms.saturating_sub(entry.cached_at_ms);
                if age_ms < self.ttl.as_millis() as u64 && !entry.credential.is_expired(now_ms) {
                    return Ok(entry.credential.clone());
                }
            }
        }

        let credential = self.resolver.resolve(provider)?;
        self.cache
            .lock()
            .insert(provider.to_string(), CacheEntry { credential: credential.clone(), cached_at_ms: now_ms });
        Ok(credential)
    }

    /// Drop a cached credential, forcing the next [`Self::get`] to re-resolve.
    pub fn invalidate(&self, provider: &str) {
        self.cache.lock().remove(provider);
    }
}

#[cfg(test)]
#[path = "credential_store_tests.rs"]
mod tests;
