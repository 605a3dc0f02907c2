// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-adapters: the outward-facing integrations `warden-engine`
//! depends on only through traits — an agent backend process, a push
//! notification sink, and credential resolution for the AuthProxy.

pub mod agent_backend;
pub mod credential_adapter;
pub mod push_sink;

pub use agent_backend::{AgentBackend, AgentBackendError, AgentSpawnConfig, ProcessAgentBackend};
pub use credential_adapter::EnvCredentialResolver;
pub use push_sink::{LoggingPushSink, PushError, PushNotification, PushSink};

#[cfg(any(test, feature = "test-support"))]
pub use agent_backend::FakeAgentBackend;
#[cfg(any(test, feature = "test-support"))]
pub use push_sink::FakePushSink;
