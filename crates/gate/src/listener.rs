// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP mode: a loopback-bound, OS-assigned-port listener the agent's gate
//! shim connects to exactly once, exchanging newline-delimited JSON.
//!
//! Mirrors the teacher's accept-loop-plus-cancellation shape, simplified to
//! one connection per listener since a Gate is a per-session boundary, not
//! a shared daemon-wide socket.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use warden_core::clock::Clock;
use warden_core::session::SessionId;
use warden_core::workspace::WorkspaceId;
use warden_wire::gate::{decode_line, encode_line, GateInbound, GateOutbound};

use crate::service::GateService;

/// A bound TCP gate, ready to accept its one shim connection.
pub struct GateListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl GateListener {
    /// Bind to an OS-assigned loopback port.
    pub async fn bind() -> io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self { listener, local_addr })
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Accept the shim's one connection and service it until the
    /// connection closes or `shutdown` fires. Trips the session's guard to
    /// fail-safe on either exit.
    pub async fn run<C: Clock + 'static>(
        self,
        service: Arc<GateService<C>>,
        session_id: SessionId,
        workspace_id: WorkspaceId,
        shutdown: CancellationToken,
    ) {
        let stream = tokio::select! {
            accepted = self.listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!(%addr, "gate shim connected");
                    stream
                }
                Err(err) => {
                    warn!(error = %err, "gate accept failed");
                    service.trip_fail_safe(&session_id, "Gate listener accept failed");
                    return;
                }
            },
            _ = shutdown.cancelled() => return,
        };

        if let Err(err) = handle_connection(stream, &service, &session_id, &workspace_id, &shutdown).await {
            info!(error = %err, session_id = %session_id, "gate connection closed");
        }
        service.trip_fail_safe(&session_id, "Extension connection lost");
    }
}

async fn handle_connection<C: Clock>(
    stream: TcpStream,
    service: &GateService<C>,
    session_id: &SessionId,
    workspace_id: &WorkspaceId,
    shutdown: &CancellationToken,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.cancelled() => return Ok(()),
        };
        let Some(line) = line else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let inbound: GateInbound = match decode_line(&line) {
            Ok(inbound) => inbound,
            Err(err) => {
                warn!(error = %err, "invalid gate line, skipping");
                continue;
            }
        };

        let outbound = match inbound {
            GateInbound::GuardReady { .. } => {
                service.guard_ready(session_id);
                Some(GateOutbound::GuardAck { status: "ok".to_string() })
            }
            GateInbound::Heartbeat => {
                service.heartbeat(session_id);
                Some(GateOutbound::HeartbeatAck)
            }
            GateInbound::GateCheck(request) => {
                let response =
                    service.check_tool_call(session_id.clone(), *workspace_id, request).await;
                Some(GateOutbound::GateResult(response))
            }
        };

        if let Some(outbound) = outbound {
            let encoded = encode_line(&outbound).map_err(io::Error::other)?;
            writer.write_all(encoded.as_bytes()).await?;
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
