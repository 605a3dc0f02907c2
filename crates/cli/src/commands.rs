// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The four admin verbs: start, stop, status, logs. Everything interactive
//! (sessions, prompts, permission decisions) belongs to the mobile client
//! over StreamMux, not here.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Result};
use warden_daemon::config::Config;
use warden_wire::control::{ControlRequest, ControlResponse};

use crate::client::ControlClient;
use crate::exit_error::ExitError;

fn client(config: &Config) -> ControlClient {
    ControlClient::new(&config.control_socket_path, warden_daemon::env::ipc_timeout())
}

pub async fn start(config: &Config, foreground: bool) -> Result<()> {
    let probe = client(config);
    if probe.is_running().await {
        println!("wardend already running");
        return Ok(());
    }

    let wardend_path = find_wardend_binary();

    if foreground {
        let status = std::process::Command::new(&wardend_path).status()?;
        if !status.success() {
            return Err(anyhow!("wardend exited with status: {status}"));
        }
        return Ok(());
    }

    std::process::Command::new(&wardend_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    for _ in 0..50 {
        if probe.is_running().await {
            println!("wardend started");
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("wardend did not come up within 5s"))
}

pub async fn stop(config: &Config) -> Result<()> {
    let client = client(config);
    if !client.is_running().await {
        println!("wardend not running");
        return Ok(());
    }
    match client.send(&ControlRequest::Shutdown).await? {
        ControlResponse::ShuttingDown => {
            println!("wardend stopping");
            Ok(())
        }
        ControlResponse::Error { message } => Err(anyhow!("{message}")),
        other => Err(anyhow!("unexpected response: {other:?}")),
    }
}

pub async fn status(config: &Config, json: bool) -> Result<()> {
    let client = client(config);
    if !client.is_running().await {
        return print_not_running(json);
    }

    let report = match client.send(&ControlRequest::Status).await? {
        ControlResponse::Status { report } => report,
        ControlResponse::Error { message } => return Err(anyhow!("{message}")),
        other => return Err(anyhow!("unexpected response: {other:?}")),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Status: running");
    println!("Version: {}", report.daemon_version);
    println!("Uptime: {}", format_uptime(report.uptime_ms / 1000));
    println!("Gate port: {}", report.gate_port);
    println!("Stream mux port: {}", report.stream_mux_port);
    println!("Auth proxy port: {}", report.auth_proxy_port);
    println!("Sessions: {}", report.sessions.len());
    for session in &report.sessions {
        println!("  {} [{}] {} ({})", session.session_id, session.status, session.name, session.workspace_id);
    }
    Ok(())
}

pub async fn logs(config: &Config, lines: usize, follow: bool, json: bool) -> Result<()> {
    let client = client(config);
    if !client.is_running().await {
        return Err(ExitError::new(1, "wardend is not running").into());
    }

    let mut seen = 0usize;
    loop {
        let response = client.send(&ControlRequest::Logs { lines: Some(lines), follow }).await?;
        let lines = match response {
            ControlResponse::LogLines { lines } => lines,
            ControlResponse::Error { message } => return Err(anyhow!("{message}")),
            other => return Err(anyhow!("unexpected response: {other:?}")),
        };

        let fresh = &lines[seen.min(lines.len())..];
        if json {
            for line in fresh {
                println!("{}", serde_json::json!({ "line": line }));
            }
        } else {
            for line in fresh {
                println!("{line}");
            }
        }
        seen = lines.len();

        if !follow {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

fn print_not_running(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "status": "not_running" }));
    } else {
        println!("wardend not running");
    }
    Ok(())
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Look for `wardend` next to the running `warden` binary, falling back to
/// `$PATH`.
fn find_wardend_binary() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("wardend");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("wardend")
}
