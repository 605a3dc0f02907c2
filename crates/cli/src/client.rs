// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin control-socket client: connects to `wardend`'s admin Unix socket,
//! sends one newline-delimited JSON [`ControlRequest`], and reads back the
//! matching [`ControlResponse`].

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use warden_wire::control::{ControlRequest, ControlResponse};

pub struct ControlClient {
    socket_path: std::path::PathBuf,
    timeout: Duration,
}

impl ControlClient {
    pub fn new(socket_path: impl AsRef<Path>, timeout: Duration) -> Self {
        Self { socket_path: socket_path.as_ref().to_path_buf(), timeout }
    }

    pub async fn is_running(&self) -> bool {
        UnixStream::connect(&self.socket_path).await.is_ok()
    }

    pub async fn send(&self, request: &ControlRequest) -> Result<ControlResponse> {
        tokio::time::timeout(self.timeout, self.send_inner(request))
            .await
            .map_err(|_| anyhow!("timed out waiting for wardend to respond"))?
    }

    async fn send_inner(&self, request: &ControlRequest) -> Result<ControlResponse> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .with_context(|| format!("wardend is not running (no socket at {})", self.socket_path.display()))?;
        let (reader, mut writer) = stream.into_split();

        let mut encoded = serde_json::to_string(request)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;

        let mut lines = BufReader::new(reader).lines();
        let line = lines.next_line().await?.ok_or_else(|| anyhow!("wardend closed the connection without responding"))?;
        Ok(serde_json::from_str(&line)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn is_running_false_when_no_socket() {
        let dir = tempfile::tempdir().unwrap();
        let client = ControlClient::new(dir.path().join("control.sock"), Duration::from_millis(100));
        assert!(!client.is_running().await);
    }

    #[tokio::test]
    async fn send_round_trips_ping_pong() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("control.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();
            let _request = lines.next_line().await.unwrap().unwrap();
            let mut response = serde_json::to_string(&ControlResponse::Pong).unwrap();
            response.push('\n');
            writer.write_all(response.as_bytes()).await.unwrap();
        });

        let client = ControlClient::new(&socket_path, Duration::from_secs(1));
        let response = client.send(&ControlRequest::Ping).await.unwrap();
        assert_eq!(response, ControlResponse::Pong);
    }

    #[tokio::test]
    async fn send_errors_when_socket_missing() {
        let dir = tempfile::tempdir().unwrap();
        let client = ControlClient::new(dir.path().join("control.sock"), Duration::from_millis(200));
        assert!(client.send(&ControlRequest::Ping).await.is_err());
    }
}
