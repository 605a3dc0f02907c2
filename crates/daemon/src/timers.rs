// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executes [`Effect::SetTimer`]/[`Effect::CancelTimer`] with a spawned
//! sleep per timer rather than the polling scheduler the job-control
//! daemon this crate started from used — the daemon is async end to end,
//! so a `tokio::time::sleep` per timer is simpler and avoids a tick loop.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use warden_core::timer::TimerId;

/// Fires fired timer ids onto an mpsc channel for the runtime loop to
/// translate back into orchestrator/gate calls.
pub struct TimerWheel {
    handles: Mutex<HashMap<TimerId, JoinHandle<()>>>,
    tx: mpsc::Sender<TimerId>,
}

impl TimerWheel {
    pub fn new() -> (Self, mpsc::Receiver<TimerId>) {
        let (tx, rx) = mpsc::channel(256);
        (Self { handles: Mutex::new(HashMap::new()), tx }, rx)
    }

    /// Schedule `id` to fire after `duration`, replacing any existing
    /// timer with the same id.
    pub fn set(&self, id: TimerId, duration: Duration) {
        self.cancel(&id);
        let tx = self.tx.clone();
        let fired_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(fired_id).await;
        });
        self.handles.lock().insert(id, handle);
    }

    /// Cancel a pending timer, if any. No-op if it already fired.
    pub fn cancel(&self, id: &TimerId) {
        if let Some(handle) = self.handles.lock().remove(id) {
            handle.abort();
        }
    }
}

impl Default for TimerWheel {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::session::SessionId;

    #[tokio::test]
    async fn fires_after_duration() {
        let (wheel, mut rx) = TimerWheel::new();
        let id = TimerId::idle(&SessionId::new());
        wheel.set(id.clone(), Duration::from_millis(10));
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, id);
    }

    #[tokio::test]
    async fn cancel_prevents_fire() {
        let (wheel, mut rx) = TimerWheel::new();
        let id = TimerId::idle(&SessionId::new());
        wheel.set(id.clone(), Duration::from_millis(50));
        wheel.cancel(&id);
        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn resetting_replaces_previous_timer() {
        let (wheel, mut rx) = TimerWheel::new();
        let id = TimerId::idle(&SessionId::new());
        wheel.set(id.clone(), Duration::from_millis(200));
        wheel.set(id.clone(), Duration::from_millis(10));
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, id);
        let result = tokio::time::timeout(Duration::from_millis(250), rx.recv()).await;
        assert!(result.is_err());
    }
}
