// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory registry of tool calls parked awaiting an owner's decision.
//!
//! A call enters the registry when the policy engine returns `ask`; it
//! leaves either because the owner answers (via the mobile client, routed
//! in through `warden-engine`) or because its timer fires first.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use warden_core::decision::{DecisionAnswer, PendingDecision, PendingDecisionId};
use warden_core::rule::RuleId;

struct Parked {
    decision: PendingDecision,
    responder: oneshot::Sender<ResolutionOutcome>,
}

/// The owner's answer to a pending decision, plus the rule it learned (if
/// scope wasn't `once` and `RuleStore::add` didn't hit a conflict).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub answer: DecisionAnswer,
    pub learned_rule_id: Option<RuleId>,
}

impl ResolutionOutcome {
    pub fn new(answer: DecisionAnswer) -> Self {
        Self { answer, learned_rule_id: None }
    }

    pub fn with_learned_rule(answer: DecisionAnswer, learned_rule_id: RuleId) -> Self {
        Self { answer, learned_rule_id: Some(learned_rule_id) }
    }
}

/// Tracks pending decisions and the one-shot channel each one's waiting
/// Gate connection will be woken up on.
#[derive(Default)]
pub struct PendingDecisionRegistry {
    parked: Mutex<HashMap<PendingDecisionId, Parked>>,
}

impl PendingDecisionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a decision, returning the receiver its Gate connection awaits.
    pub fn park(&self, decision: PendingDecision) -> oneshot::Receiver<ResolutionOutcome> {
        let (tx, rx) = oneshot::channel();
        let id = decision.id.clone();
        self.parked.lock().insert(id, Parked { decision, responder: tx });
        rx
    }

    /// Resolve a pending decision with the owner's answer. Returns `false`
    /// if no such decision is parked (already resolved or timed out).
    pub fn resolve(&self, id: &PendingDecisionId, outcome: ResolutionOutcome) -> bool {
        if let Some(parked) = self.parked.lock().remove(id) {
            let _ = parked.responder.send(outcome);
            true
        } else {
            false
        }
    }

    /// All currently parked decisions, for display to the owner.
    pub fn pending(&self) -> Vec<PendingDecision> {
        self.parked.lock().values().map(|p| p.decision.clone()).collect()
    }

    /// Drop every parked decision whose timeout has elapsed, returning
    /// their ids so the caller can audit them as `ResolvedBy::Timeout`.
    pub fn expire_timed_out(&self, now_ms: u64) -> Vec<PendingDecisionId> {
        let mut parked = self.parked.lock();
        let expired: Vec<PendingDecisionId> = parked
            .values()
            .filter(|p| p.decision.is_timed_out(now_ms))
            .map(|p| p.decision.id.clone())
            .collect();
        for id in &expired {
            // Dropping the responder (implicitly, by removing the entry)
            // closes the receiver; the waiting Gate connection's recv()
            // resolves to an error, which callers treat as "deny".
            parked.remove(id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.parked.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
