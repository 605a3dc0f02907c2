// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session durable replay ring and subscriber fanout.
//!
//! Every translated [`ServerMessage`] for a session passes through
//! [`SessionBroadcaster::publish`]. Durable messages are assigned the
//! session's next monotonic `seq` and retained in a bounded ring before
//! fanout; everything else is broadcast straight through. `StreamMux`
//! (in the daemon binary) is the only consumer: it stamps `stream_seq` and
//! applies backpressure dropping on top of what comes out of here.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use warden_core::session::SessionId;
use warden_wire::client::ServerMessage;

/// Default per-session ring capacity. See `DESIGN.md`'s Open Question
/// decisions for why 256.
pub const DEFAULT_RING_CAPACITY: usize = 256;

/// One durable message retained in a session's ring.
#[derive(Debug, Clone, PartialEq)]
pub struct RingEntry {
    pub seq: u64,
    pub message: ServerMessage,
}

/// Result of a catch-up request.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchUp {
    pub events: Vec<RingEntry>,
    pub current_seq: u64,
    pub catch_up_complete: bool,
}

struct SessionRing {
    entries: VecDeque<RingEntry>,
    next_seq: u64,
    sender: broadcast::Sender<ServerMessage>,
}

impl SessionRing {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(broadcast_capacity(capacity));
        Self { entries: VecDeque::with_capacity(capacity), next_seq: 1, sender }
    }

    fn current_seq(&self) -> u64 {
        self.next_seq.saturating_sub(1)
    }
}

/// `broadcast` needs its own buffer independent of the durable ring, since
/// it also carries ephemeral messages the ring never stores; give it
/// comfortable headroom over the ring capacity so a briefly slow reader
/// doesn't lag on ephemeral traffic alone.
fn broadcast_capacity(ring_capacity: usize) -> usize {
    (ring_capacity * 4).max(1024)
}

/// Tracks one durable event ring and subscriber fanout per live session.
pub struct SessionBroadcaster {
    capacity: usize,
    sessions: Mutex<HashMap<SessionId, SessionRing>>,
}

impl SessionBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RING_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, sessions: Mutex::new(HashMap::new()) }
    }

    /// Subscribe to a session's live message stream. Creates the session's
    /// ring if this is the first subscriber.
    pub fn subscribe(&self, session_id: &SessionId) -> broadcast::Receiver<ServerMessage> {
        let mut sessions = self.sessions.lock();
        let ring = sessions.entry(session_id.clone()).or_insert_with(|| SessionRing::new(self.capacity));
        ring.sender.subscribe()
    }

    /// Publish one translated message for a session. Assigns and retains a
    /// `seq` if `message.is_durable()`; broadcasts to current subscribers
    /// either way. Broadcasting with no subscribers is not an error.
    pub fn publish(&self, session_id: &SessionId, message: ServerMessage) {
        let mut sessions = self.sessions.lock();
        let ring = sessions.entry(session_id.clone()).or_insert_with(|| SessionRing::new(self.capacity));
        if message.is_durable() {
            let seq = ring.next_seq;
            ring.next_seq += 1;
            ring.entries.push_back(RingEntry { seq, message: message.clone() });
            if ring.entries.len() > self.capacity {
                ring.entries.pop_front();
            }
        }
        let _ = ring.sender.send(message);
    }

    /// Replay durable events since `since_seq` for a reconnecting
    /// subscriber. `catch_up_complete=false` means the cursor precedes the
    /// ring's oldest retained entry; the caller must reload the session's
    /// full state instead of trusting the (empty) event list.
    pub fn get_catch_up(&self, session_id: &SessionId, since_seq: u64) -> CatchUp {
        let sessions = self.sessions.lock();
        let Some(ring) = sessions.get(session_id) else {
            return CatchUp { events: Vec::new(), current_seq: 0, catch_up_complete: since_seq == 0 };
        };
        match ring.entries.front() {
            Some(oldest) if since_seq.saturating_add(1) < oldest.seq => {
                CatchUp { events: Vec::new(), current_seq: ring.current_seq(), catch_up_complete: false }
            }
            _ => {
                let events = ring.entries.iter().filter(|e| e.seq > since_seq).cloned().collect();
                CatchUp { events, current_seq: ring.current_seq(), catch_up_complete: true }
            }
        }
    }

    /// Drop a session's ring and subscriber channel entirely, on teardown.
    pub fn remove_session(&self, session_id: &SessionId) {
        self.sessions.lock().remove(session_id);
    }
}

impl Default for SessionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "broadcaster_tests.rs"]
mod tests;
