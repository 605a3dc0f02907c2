// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use warden_core::session::SessionId;

use super::*;

fn session_id() -> SessionId {
    SessionId::from("abc12345".to_string())
}

#[test]
fn first_update_arms_the_debounce_timer() {
    let bridge = LiveActivityBridge::new();
    let id = session_id();

    let effect = bridge.update(
        &id,
        LiveActivityUpdate { active_tool: Some("bash".to_string()), ..Default::default() },
        SessionStatus::Busy,
    );

    match effect {
        Some(Effect::SetTimer { id: timer_id, duration }) => {
            assert_eq!(timer_id, TimerId::debounce(&id));
            assert_eq!(duration, DEFAULT_LIVE_ACTIVITY_DEBOUNCE);
        }
        other => panic!("expected a debounce SetTimer effect, got {other:?}"),
    }
    assert!(bridge.has_pending(&id));
}

#[test]
fn subsequent_updates_before_flush_do_not_rearm_the_timer() {
    let bridge = LiveActivityBridge::new();
    let id = session_id();

    let first = bridge.update(&id, LiveActivityUpdate::default(), SessionStatus::Busy);
    assert!(first.is_some());

    let second = bridge.update(
        &id,
        LiveActivityUpdate { active_tool: Some("edit".to_string()), ..Default::default() },
        SessionStatus::Busy,
    );
    assert!(second.is_none());
}

#[test]
fn latest_non_null_field_wins_on_merge() {
    let bridge = LiveActivityBridge::new();
    let id = session_id();

    bridge.update(
        &id,
        LiveActivityUpdate {
            active_tool: Some("bash".to_string()),
            last_event: Some("tool_start".to_string()),
            elapsed_seconds: Some(3),
            ..Default::default()
        },
        SessionStatus::Busy,
    );
    bridge.update(
        &id,
        LiveActivityUpdate { active_tool: Some("edit".to_string()), elapsed_seconds: Some(9), ..Default::default() },
        SessionStatus::Busy,
    );

    let effect = bridge.flush(&id).unwrap();
    match effect {
        Effect::PushLiveActivity { active_tool, last_event, elapsed_seconds, .. } => {
            assert_eq!(active_tool.as_deref(), Some("edit"));
            assert_eq!(last_event.as_deref(), Some("tool_start"));
            assert_eq!(elapsed_seconds, 9);
        }
        other => panic!("expected PushLiveActivity, got {other:?}"),
    }
}

#[test]
fn priority_folds_in_as_a_max() {
    let bridge = LiveActivityBridge::new();
    let id = session_id();

    bridge.update(&id, LiveActivityUpdate { priority: 1, ..Default::default() }, SessionStatus::Busy);
    bridge.update(&id, LiveActivityUpdate { priority: 5, ..Default::default() }, SessionStatus::Busy);
    bridge.update(&id, LiveActivityUpdate { priority: 2, ..Default::default() }, SessionStatus::Busy);

    // priority isn't exposed on the effect, but merging must not panic or
    // regress the max once raised; confirm indirectly via a second round
    // after flush, where a fresh low-priority update seeds cleanly.
    bridge.flush(&id).unwrap();
    let effect = bridge.update(&id, LiveActivityUpdate { priority: 0, ..Default::default() }, SessionStatus::Busy);
    assert!(effect.is_some());
}

#[test]
fn end_is_sticky_across_merges() {
    let bridge = LiveActivityBridge::new();
    let id = session_id();

    bridge.update(&id, LiveActivityUpdate { end: true, ..Default::default() }, SessionStatus::Stopping);
    bridge.update(&id, LiveActivityUpdate { active_tool: Some("bash".to_string()), ..Default::default() }, SessionStatus::Stopping);

    let effect = bridge.flush(&id).unwrap();
    match effect {
        Effect::PushLiveActivity { end, .. } => assert!(end),
        other => panic!("expected PushLiveActivity, got {other:?}"),
    }
}

#[test]
fn tool_finished_clears_the_active_tool() {
    let bridge = LiveActivityBridge::new();
    let id = session_id();

    bridge.update(
        &id,
        LiveActivityUpdate { active_tool: Some("bash".to_string()), ..Default::default() },
        SessionStatus::Busy,
    );
    bridge.update(&id, LiveActivityUpdate { tool_finished: true, ..Default::default() }, SessionStatus::Busy);

    let effect = bridge.flush(&id).unwrap();
    match effect {
        Effect::PushLiveActivity { active_tool, .. } => assert!(active_tool.is_none()),
        other => panic!("expected PushLiveActivity, got {other:?}"),
    }
}

#[test]
fn flush_clears_the_pending_payload() {
    let bridge = LiveActivityBridge::new();
    let id = session_id();

    bridge.update(&id, LiveActivityUpdate::default(), SessionStatus::Busy);
    assert!(bridge.flush(&id).is_some());
    assert!(!bridge.has_pending(&id));
    assert!(bridge.flush(&id).is_none());
}

#[test]
fn flush_with_no_pending_payload_returns_none() {
    let bridge = LiveActivityBridge::new();
    let id = session_id();
    assert!(bridge.flush(&id).is_none());
}

#[test]
fn seeded_status_falls_back_to_current_status_when_update_omits_it() {
    let bridge = LiveActivityBridge::new();
    let id = session_id();

    bridge.update(&id, LiveActivityUpdate::default(), SessionStatus::Busy);
    let effect = bridge.flush(&id).unwrap();
    match effect {
        Effect::PushLiveActivity { status, .. } => assert_eq!(status, SessionStatus::Busy),
        other => panic!("expected PushLiveActivity, got {other:?}"),
    }
}

#[test]
fn distinct_sessions_are_tracked_independently() {
    let bridge = LiveActivityBridge::new();
    let a = session_id();
    let b = SessionId::from("zzz99999".to_string());

    bridge.update(&a, LiveActivityUpdate { active_tool: Some("bash".to_string()), ..Default::default() }, SessionStatus::Busy);
    bridge.update(&b, LiveActivityUpdate { active_tool: Some("edit".to_string()), ..Default::default() }, SessionStatus::Busy);

    let effect_a = bridge.flush(&a).unwrap();
    let effect_b = bridge.flush(&b).unwrap();

    match (effect_a, effect_b) {
        (Effect::PushLiveActivity { session_id: sa, active_tool: ta, .. }, Effect::PushLiveActivity { session_id: sb, active_tool: tb, .. }) => {
            assert_eq!(sa, a);
            assert_eq!(sb, b);
            assert_eq!(ta.as_deref(), Some("bash"));
            assert_eq!(tb.as_deref(), Some("edit"));
        }
        other => panic!("expected two PushLiveActivity effects, got {other:?}"),
    }
}
