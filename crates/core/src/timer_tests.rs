// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn heartbeat_timer_round_trips_through_kind() {
    let session = SessionId::new();
    let id = TimerId::heartbeat(&session);
    assert_eq!(id.kind(), Some(TimerKind::Heartbeat(session.clone())));
    assert_eq!(id.kind().unwrap().session_id(), Some(&session));
}

#[test]
fn approval_timer_has_no_session_id() {
    let decision = PendingDecisionId::new();
    let id = TimerId::approval(&decision);
    assert_eq!(id.kind(), Some(TimerKind::Approval(decision)));
    assert_eq!(id.kind().unwrap().session_id(), None);
}

#[test]
fn unrecognized_timer_id_parses_to_none() {
    assert_eq!(TimerKind::parse("garbage"), None);
}

#[test]
fn idle_and_debounce_timers_are_distinct_for_same_session() {
    let session = SessionId::new();
    let idle = TimerId::idle(&session);
    let debounce = TimerId::debounce(&session);
    assert_ne!(idle, debounce);
}
