// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    for key in ["ANTHROPIC_OAUTH_TOKEN", "ANTHROPIC_API_KEY"] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn oauth_env_var_takes_priority() {
    clear_env();
    std::env::set_var("ANTHROPIC_OAUTH_TOKEN", "tok-123");
    std::env::set_var("ANTHROPIC_API_KEY", "key-456");

    let resolver = EnvCredentialResolver::new();
    let credential = resolver.resolve("anthropic").unwrap();
    assert!(matches!(credential, CredentialEntry::OAuth { access_token, .. } if access_token == "tok-123"));

    clear_env();
}

#[test]
#[serial]
fn falls_back_to_api_key_env_var_when_no_oauth_token() {
    clear_env();
    std::env::set_var("ANTHROPIC_API_KEY", "key-456");
    std::env::remove_var("HOME");

    let resolver = EnvCredentialResolver::new();
    let credential = resolver.resolve("anthropic").unwrap();
    assert!(matches!(credential, CredentialEntry::ApiKey { key } if key == "key-456"));

    clear_env();
}

#[test]
#[serial]
fn unresolved_when_nothing_is_configured() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("HOME", dir.path());

    let resolver = EnvCredentialResolver::new();
    let err = resolver.resolve("anthropic").unwrap_err();
    assert!(matches!(err, CredentialStoreError::Unresolved(_)));

    std::env::remove_var("HOME");
}

#[test]
#[serial]
fn reads_oauth_token_from_credentials_file_when_no_env_var() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let claude_dir = dir.path().join(".claude");
    std::fs::create_dir_all(&claude_dir).unwrap();
    std::fs::write(
        claude_dir.join(".credentials.json"),
        serde_json::json!({ "claudeAiOauth": { "accessToken": "file-token" } }).to_string(),
    )
    .unwrap();
    std::env::set_var("HOME", dir.path());

    let resolver = EnvCredentialResolver::new();
    let credential = resolver.resolve("anthropic").unwrap();
    assert!(matches!(credential, CredentialEntry::OAuth { access_token, .. } if access_token == "file-token"));

    std::env::remove_var("HOME");
}
