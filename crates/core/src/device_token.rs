// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device tokens the owner's mobile client registers with the daemon: one
//! kind for push delivery (APNs device token / Live Activity push token),
//! one kind for pairing a new client device to this daemon.

use serde::{Deserialize, Serialize};

/// A registered push destination. `kind` distinguishes a plain remote
/// notification token from a Live Activity's separate push-to-start /
/// push-to-update token, since a client may register several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushDeviceToken {
    pub token: String,
    pub kind: PushTokenKind,
    pub registered_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushTokenKind {
    Remote,
    LiveActivity,
}

/// A one-time pairing token presented by a new client device, recorded so
/// a later WebSocket connection can be trusted without re-running the
/// pairing ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthDeviceToken {
    pub token: String,
    pub device_name: String,
    pub registered_at_ms: u64,
}

#[cfg(test)]
#[path = "device_token_tests.rs"]
mod tests;
