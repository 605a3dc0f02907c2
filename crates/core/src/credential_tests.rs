// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn api_key_never_expires() {
    let cred = CredentialEntry::ApiKey { key: "sk-test".to_string() };
    assert!(!cred.is_expired(u64::MAX));
    assert_eq!(cred.bearer_value(), "sk-test");
}

#[test]
fn oauth_without_expiry_never_expires() {
    let cred = CredentialEntry::OAuth { access_token: "tok".to_string(), expires_at_ms: None };
    assert!(!cred.is_expired(u64::MAX));
}

#[test]
fn oauth_with_past_expiry_is_expired() {
    let cred = CredentialEntry::OAuth { access_token: "tok".to_string(), expires_at_ms: Some(100) };
    assert!(cred.is_expired(101));
    assert!(!cred.is_expired(99));
}

#[test]
fn wire_tag_is_snake_case_type_field() {
    let cred = CredentialEntry::ApiKey { key: "sk-test".to_string() };
    let json = serde_json::to_value(&cred).unwrap();
    assert_eq!(json["type"], "api_key");
}
