// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin control socket: a Unix domain socket the `warden` CLI connects to
//! for `Ping`/`Hello`/`Status`/`Shutdown`/`Logs`, newline-delimited JSON
//! per [`warden_wire::control`]. Mirrors the gate listener's
//! accept-loop-plus-cancellation shape, but serves many short-lived
//! connections instead of exactly one.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use warden_wire::control::{ControlRequest, ControlResponse};

use crate::runtime::Daemon;

/// Bound admin control socket, ready to accept CLI connections.
pub struct ControlListener {
    listener: UnixListener,
    path: PathBuf,
}

impl ControlListener {
    /// Bind at `path`, removing a stale socket file left behind by an
    /// unclean shutdown.
    pub fn bind(path: &Path) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        Ok(Self { listener, path: path.to_path_buf() })
    }

    /// Accept connections until `shutdown` fires, servicing each on its
    /// own task.
    pub async fn run(self, daemon: Arc<Daemon>, shutdown: CancellationToken) {
        loop {
            let stream = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _addr)) => stream,
                    Err(err) => {
                        warn!(error = %err, "control socket accept failed");
                        continue;
                    }
                },
                _ = shutdown.cancelled() => break,
            };

            let daemon = daemon.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, &daemon, &shutdown).await {
                    debug!(error = %err, "control connection closed");
                }
            });
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn handle_connection(
    stream: UnixStream,
    daemon: &Daemon,
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

        let request: ControlRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                let response = ControlResponse::Error { message: err.to_string() };
                write_response(&mut writer, &response).await?;
                continue;
            }
        };

        let response = handle_request(request, daemon, shutdown).await;
        let shutting_down = matches!(response, ControlResponse::ShuttingDown);
        write_response(&mut writer, &response).await?;
        if shutting_down {
            return Ok(());
        }
    }
}

async fn handle_request(
    request: ControlRequest,
    daemon: &Daemon,
    shutdown: &CancellationToken,
) -> ControlResponse {
    match request {
        ControlRequest::Ping => ControlResponse::Pong,
        ControlRequest::Hello { client_version } => {
            info!(%client_version, "cli hello");
            ControlResponse::Hello { daemon_version: crate::env::PROTOCOL_VERSION.to_string() }
        }
        ControlRequest::Status => {
            let report = daemon.status_report();
            ControlResponse::Status { report }
        }
        ControlRequest::Shutdown => {
            info!("shutdown requested over control socket");
            shutdown.cancel();
            ControlResponse::ShuttingDown
        }
        ControlRequest::Logs { lines, follow: _ } => match daemon.tail_log(lines.unwrap_or(200)) {
            Ok(lines) => ControlResponse::LogLines { lines },
            Err(err) => ControlResponse::Error { message: err.to_string() },
        },
    }
}

async fn write_response(
    writer: &mut (impl AsyncWriteExt + Unpin),
    response: &ControlResponse,
) -> io::Result<()> {
    let mut encoded = serde_json::to_string(response).map_err(io::Error::other)?;
    encoded.push('\n');
    writer.write_all(encoded.as_bytes()).await
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
