// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_json() -> &'static str {
    r#"{
        "schemaVersion": 1,
        "fallback": "ask",
        "guardrails": [
            {
                "id": "block-auth-json-read",
                "decision": "deny",
                "immutable": true,
                "match": { "pathMatches": "**/agent/auth.json" }
            }
        ],
        "permissions": [
            { "id": "allow-git-status", "decision": "allow", "match": { "executable": "git", "commandMatches": "git status*" } }
        ],
        "heuristics": {
            "pipeToShell": "block",
            "dataEgress": false
        }
    }"#
}

#[test]
fn parses_schema_version_1_document() {
    let config = PolicyConfig::parse(sample_json()).expect("valid document");
    assert_eq!(config.schema_version, 1);
    assert_eq!(config.fallback, Decision::Ask);
    assert_eq!(config.guardrails.len(), 1);
    assert_eq!(config.permissions.len(), 1);
    config.validate().expect("valid document");
}

#[test]
fn block_is_accepted_as_a_synonym_for_deny() {
    let config = PolicyConfig::parse(sample_json()).unwrap();
    assert_eq!(config.guardrails[0].decision, Decision::Deny);
    assert_eq!(config.heuristics.pipe_to_shell, HeuristicAction::Decision(Decision::Deny));
}

#[test]
fn heuristic_false_disables_it() {
    let config = PolicyConfig::parse(sample_json()).unwrap();
    assert_eq!(config.heuristics.data_egress, HeuristicAction::Disabled);
}

#[test]
fn heuristic_true_is_rejected() {
    let json = r#"{"schemaVersion":1,"fallback":"ask","heuristics":{"pipeToShell":true}}"#;
    assert!(PolicyConfig::parse(json).is_err());
}

#[test]
fn unsupported_schema_version_is_rejected() {
    let json = r#"{"schemaVersion":2,"fallback":"ask"}"#;
    let config = PolicyConfig::parse(json).unwrap();
    assert_eq!(config.validate(), Err(PolicyConfigError::UnsupportedSchemaVersion(2)));
}

#[test]
fn permission_with_no_match_criteria_is_rejected() {
    let json = r#"{
        "schemaVersion": 1,
        "fallback": "ask",
        "permissions": [{ "id": "empty-match", "decision": "allow", "match": {} }]
    }"#;
    let config = PolicyConfig::parse(json).unwrap();
    assert_eq!(config.validate(), Err(PolicyConfigError::EmptyMatch("empty-match".to_string())));
}

#[test]
fn permission_id_must_be_a_valid_slug() {
    let json = r#"{
        "schemaVersion": 1,
        "fallback": "ask",
        "permissions": [{ "id": "x", "decision": "allow", "match": { "tool": "bash" } }]
    }"#;
    let config = PolicyConfig::parse(json).unwrap();
    assert_eq!(config.validate(), Err(PolicyConfigError::InvalidId("x".to_string())));
}

#[test]
fn default_config_blocks_the_scenario_2_secret_file() {
    let config = PolicyConfig::default_config();
    config.validate().expect("built-in config is valid");
    let guardrail = config.guardrails.iter().find(|p| p.id == "block-auth-json-read").expect("present");
    assert_eq!(guardrail.decision, Decision::Deny);
    assert!(guardrail.immutable);
}

#[test]
fn compiled_policy_only_hard_denies_deny_guardrails() {
    let mut config = PolicyConfig::default_config();
    config.guardrails.push(Permission {
        id: "allow-guardrail".to_string(),
        decision: Decision::Allow,
        label: None,
        reason: None,
        immutable: false,
        match_: PermissionMatch { tool: Some("bash".to_string()), ..Default::default() },
    });
    let compiled = CompiledPolicy::compile(&config);
    assert!(compiled.hard_deny.iter().all(|p| p.decision == Decision::Deny));
    assert!(!compiled.hard_deny.iter().any(|p| p.id == "allow-guardrail"));
}

#[test]
fn round_trips_through_json() {
    let config = PolicyConfig::default_config();
    let json = serde_json::to_string(&config).unwrap();
    let parsed = PolicyConfig::parse(&json).unwrap();
    assert_eq!(config, parsed);
}
