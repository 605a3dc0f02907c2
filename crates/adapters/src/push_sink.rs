// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push notification adapter: delivers a permission request or a live
//! activity update to the mobile client when it isn't connected to the
//! StreamMux WebSocket to receive it directly.
//!
//! This is an out-of-scope external collaborator (APNs, FCM, whatever the
//! mobile client's push provider is) — `warden-engine` depends only on
//! [`PushSink`]. The logging reference implementation below stands in for
//! that integration.

use async_trait::async_trait;
use thiserror::Error;
use warden_core::session::SessionStatus;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push delivery failed: {0}")]
    DeliveryFailed(String),
}

/// A push-worthy notification for a disconnected mobile client.
#[derive(Debug, Clone, PartialEq)]
pub enum PushNotification {
    /// A tool call is parked awaiting an owner decision.
    Permission { decision_id: String, session_id: String, summary: String },
    /// A session's Live Activity should refresh its displayed content
    /// state, as coalesced by `warden-engine`'s `LiveActivityBridge`.
    LiveActivity {
        session_id: String,
        status: SessionStatus,
        active_tool: Option<String>,
        pending_permissions: u32,
        last_event: Option<String>,
        elapsed_seconds: u64,
        /// Terminal update: the bridge also tells the sink to end the
        /// activity and drop its stored push token.
        end: bool,
    },
}

#[async_trait]
pub trait PushSink: Send + Sync {
    async fn send(&self, notification: PushNotification) -> Result<(), PushError>;
}

/// Reference [`PushSink`] that logs every notification instead of
/// delivering it anywhere. Good enough for a single-owner host running
/// without a configured push provider; a production deployment swaps
/// this for an APNs/FCM-backed adapter behind the same trait.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingPushSink;

#[async_trait]
impl PushSink for LoggingPushSink {
    async fn send(&self, notification: PushNotification) -> Result<(), PushError> {
        match &notification {
            PushNotification::Permission { decision_id, session_id, summary } => {
                tracing::info!(%decision_id, %session_id, %summary, "push: permission requested");
            }
            PushNotification::LiveActivity { session_id, status, active_tool, pending_permissions, end, .. } => {
                tracing::info!(
                    %session_id,
                    %status,
                    active_tool = active_tool.as_deref().unwrap_or(""),
                    pending_permissions,
                    end,
                    "push: live activity update"
                );
            }
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct FakePushSink {
        sent: Arc<Mutex<Vec<PushNotification>>>,
    }

    impl FakePushSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<PushNotification> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl PushSink for FakePushSink {
        async fn send(&self, notification: PushNotification) -> Result<(), PushError> {
            self.sent.lock().push(notification);
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePushSink;

#[cfg(test)]
#[path = "push_sink_tests.rs"]
mod tests;
