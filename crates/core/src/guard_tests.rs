// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn default_guard_is_unguarded_and_blocks_evaluation() {
    let guard = Guard::default();
    assert_eq!(guard.state, GuardState::Unguarded);
    assert!(!guard.state.allows_evaluation());
}

#[test]
fn connect_moves_to_guarded_and_allows_evaluation() {
    let mut guard = Guard::new(4000, 0);
    guard.connect(10);
    assert_eq!(guard.state, GuardState::Guarded);
    assert_eq!(guard.last_heartbeat_ms, Some(10));
    assert!(guard.state.allows_evaluation());
}

#[test]
fn fail_safe_blocks_evaluation() {
    let mut guard = Guard::new(4000, 0);
    guard.connect(0);
    guard.trip_fail_safe("heartbeat lost", 50);
    assert_eq!(guard.state, GuardState::FailSafe);
    assert_eq!(guard.reason.as_deref(), Some("heartbeat lost"));
    assert!(!guard.state.allows_evaluation());
}

#[test]
fn rearm_clears_reason_and_returns_to_unguarded() {
    let mut guard = Guard::new(4000, 0);
    guard.connect(0);
    guard.trip_fail_safe("heartbeat lost", 10);
    guard.rearm(20);
    assert_eq!(guard.state, GuardState::Unguarded);
    assert!(guard.reason.is_none());
    assert!(guard.last_heartbeat_ms.is_none());
    assert_eq!(guard.changed_at_ms, 20);
    assert!(!guard.state.allows_evaluation());
}

#[test]
fn heartbeat_is_stale_past_the_max_age() {
    let mut guard = Guard::new(4000, 0);
    guard.connect(0);
    assert!(!guard.heartbeat_is_stale(40_000, 45_000));
    assert!(guard.heartbeat_is_stale(46_000, 45_000));
}

#[test]
fn never_connected_guard_is_not_reported_stale() {
    let guard = Guard::new(4000, 0);
    assert!(!guard.heartbeat_is_stale(1_000_000, 45_000));
}

#[test]
fn record_heartbeat_updates_the_last_seen_time() {
    let mut guard = Guard::new(4000, 0);
    guard.connect(0);
    guard.record_heartbeat(15_000);
    assert!(!guard.heartbeat_is_stale(59_000, 45_000));
}
