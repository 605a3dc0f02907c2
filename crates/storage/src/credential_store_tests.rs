// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use warden_core::clock::FakeClock;

struct CountingResolver {
    calls: Arc<AtomicUsize>,
}

impl CredentialResolver for CountingResolver {
    fn resolve(&self, provider: &str) -> Result<CredentialEntry, CredentialStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if provider == "missing" {
            return Err(CredentialStoreError::Unresolved(provider.to_string()));
        }
        Ok(CredentialEntry::ApiKey { key: format!("key-for-{provider}") })
    }
}

#[test]
fn repeated_get_within_ttl_hits_the_cache_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let clock = FakeClock::new();
    let store = CredentialStore::new(Box::new(CountingResolver { calls: calls.clone() }), clock);

    store.get("anthropic").unwrap();
    store.get("anthropic").unwrap();
    store.get("anthropic").unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn get_past_the_ttl_re_resolves() {
    let calls = Arc::new(AtomicUsize::new(0));
    let clock = FakeClock::new();
    let store = CredentialStore::with_ttl(
        Box::new(CountingResolver { calls: calls.clone() }),
        clock.clone(),
        std::time::Duration::from_secs(5),
    );

    store.get("anthropic").unwrap();
    clock.advance(std::time::Duration::from_secs(6));
    store.get("anthropic").unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn invalidate_forces_a_re_resolve() {
    let calls = Arc::new(AtomicUsize::new(0));
    let clock = FakeClock::new();
    let store = CredentialStore::new(Box::new(CountingResolver { calls: calls.clone() }), clock);

    store.get("anthropic").unwrap();
    store.invalidate("anthropic");
    store.get("anthropic").unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn unresolved_provider_surfaces_the_resolver_error() {
    let clock = FakeClock::new();
    let store = CredentialStore::new(Box::new(CountingResolver { calls: Arc::new(AtomicUsize::new(0)) }), clock);
    let err = store.get("missing").unwrap_err();
    assert!(matches!(err, CredentialStoreError::Unresolved(_)));
}
