// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-core: shared domain types for the Warden control plane.

pub mod macros;

pub mod audit;
pub mod clock;
pub mod config;
pub mod credential;
pub mod decision;
pub mod device_token;
pub mod effect;
pub mod event;
pub mod guard;
pub mod id;
pub mod message;
pub mod normalize;
pub mod rule;
pub mod session;
pub mod timer;
pub mod workspace;

pub use audit::{AuditEntry, AuditId, ResolvedBy};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::ServerConfig;
pub use credential::CredentialEntry;
pub use decision::{DecisionAnswer, PendingDecision, PendingDecisionId};
pub use device_token::{AuthDeviceToken, PushDeviceToken, PushTokenKind};
pub use effect::Effect;
pub use event::AgentEvent;
pub use guard::{Guard, GuardState};
pub use id::{short, IdBuf, ID_MAX_LEN};
pub use message::{MessageId, MessageRole, SessionMessage};
pub use normalize::{expand_home, normalize_path_pattern};
pub use rule::{ConflictKey, Decision, Provenance, ResponseScope, Rule, RuleId, RuleSignature, Scope};
pub use session::{AgentRuntimeHandle, Session, SessionId, SessionStatus, SessionUsage};
pub use timer::{TimerId, TimerKind};
pub use workspace::{AllowedPath, PathAccess, Workspace, WorkspaceId};
