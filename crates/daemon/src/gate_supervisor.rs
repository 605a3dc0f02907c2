// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns and tears down a [`GateListener`] per session: binds a loopback
//! port, registers the session's guard with [`GateService`], and runs the
//! listener on its own task until the session ends or the daemon shuts
//! down.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use warden_core::clock::SystemClock;
use warden_core::session::SessionId;
use warden_core::workspace::WorkspaceId;
use warden_gate::{GateListener, GateService};

/// Bind a session's gate, register it, and run its listener on a
/// background task. Returns the bound port to pass to the agent backend
/// so its shim knows where to connect.
pub async fn spawn_for_session(
    gate: Arc<GateService<SystemClock>>,
    session_id: SessionId,
    workspace_id: WorkspaceId,
    shutdown: CancellationToken,
) -> std::io::Result<u16> {
    let listener = GateListener::bind().await?;
    let port = listener.port();
    gate.register_session(session_id.clone(), port);

    tokio::spawn(async move {
        info!(%session_id, port, "gate listener running");
        listener.run(gate, session_id.clone(), workspace_id, shutdown).await;
        info!(%session_id, "gate listener stopped");
    });

    Ok(port)
}

/// Deny everything still parked for `session_id` and drop its guard.
pub fn teardown(gate: &GateService<SystemClock>, session_id: &SessionId) {
    gate.end_session(session_id);
}
