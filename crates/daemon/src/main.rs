// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wardend`: the single-owner host-side control plane. Acquires the state
//! directory lock, wires the gate/orchestrator/storage layers together,
//! and serves the admin control socket, the StreamMux WebSocket, and the
//! AuthProxy reverse proxy until told to stop.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use warden_adapters::agent_backend::ProcessAgentBackend;
use warden_adapters::push_sink::LoggingPushSink;
use warden_daemon::authproxy::AuthProxy;
use warden_daemon::{authproxy, config, control, env, logging, runtime, streammux};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::load()?;
    let _lock = config::acquire_lock(&config)?;
    let _log_guard = logging::init(&config.log_path)?;

    info!(state_dir = %config.state_dir.display(), "wardend starting");

    let agent_command = std::env::var("WARDEN_AGENT_COMMAND").unwrap_or_else(|_| "claude".to_string());
    let agent_backend = Arc::new(ProcessAgentBackend::new(agent_command));
    let push_sink = Arc::new(LoggingPushSink);

    let (daemon, timer_rx, event_rx) = runtime::Daemon::new(config.clone(), agent_backend, push_sink)?;
    let auth_proxy = Arc::new(AuthProxy::new(daemon.credentials.clone()));

    let shutdown = CancellationToken::new();

    let control_listener = control::ControlListener::bind(&config.control_socket_path)?;
    let control_task = tokio::spawn(control_listener.run(daemon.clone(), shutdown.clone()));

    let stream_mux_listener = TcpListener::bind(("127.0.0.1", env::stream_mux_port())).await?;
    let stream_mux_port = stream_mux_listener.local_addr()?.port();
    daemon.set_stream_mux_port(stream_mux_port);
    let stream_mux_router = streammux::router(daemon.clone());
    let stream_mux_shutdown = shutdown.clone();
    let stream_mux_task = tokio::spawn(async move {
        let result = axum::serve(stream_mux_listener, stream_mux_router)
            .with_graceful_shutdown(stream_mux_shutdown.cancelled_owned())
            .await;
        if let Err(err) = result {
            error!(error = %err, "stream mux server exited");
        }
    });
    info!(port = stream_mux_port, "stream mux listening");

    let auth_proxy_listener = TcpListener::bind(("127.0.0.1", env::auth_proxy_port())).await?;
    let auth_proxy_port = auth_proxy_listener.local_addr()?.port();
    daemon.set_auth_proxy_port(auth_proxy_port);
    let auth_proxy_router = authproxy::router(auth_proxy.clone());
    let auth_proxy_shutdown = shutdown.clone();
    let auth_proxy_task = tokio::spawn(async move {
        let result = axum::serve(auth_proxy_listener, auth_proxy_router)
            .with_graceful_shutdown(auth_proxy_shutdown.cancelled_owned())
            .await;
        if let Err(err) = result {
            error!(error = %err, "auth proxy server exited");
        }
    });
    info!(port = auth_proxy_port, "auth proxy listening");

    let effect_loop_task = tokio::spawn(daemon.clone().run_effect_loop(timer_rx, event_rx, shutdown.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }

    let drain_timeout = daemon.drain_timeout();
    let drained = tokio::time::timeout(
        drain_timeout,
        async {
            let _ = control_task.await;
            let _ = stream_mux_task.await;
            let _ = auth_proxy_task.await;
            let _ = effect_loop_task.await;
        },
    )
    .await;
    if drained.is_err() {
        error!("shutdown drain timed out, exiting anyway");
    }

    info!("wardend stopped");
    Ok(())
}
