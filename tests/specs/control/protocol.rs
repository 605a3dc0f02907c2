use std::ffi::OsString;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::prelude::*;
use serial_test::serial;
use tempfile::tempdir;

fn wardend_env(state_dir: &std::path::Path) -> Vec<(&'static str, OsString)> {
    vec![
        ("WARDEN_STATE_DIR", state_dir.as_os_str().to_owned()),
        ("WARDEN_STREAM_MUX_PORT", OsString::from("0")),
        ("WARDEN_AUTH_PROXY_PORT", OsString::from("0")),
    ]
}

fn wait_for_ready(dir: &std::path::Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let mut cmd = Command::cargo_bin("warden").expect("warden binary should be built");
        cmd.envs(wardend_env(dir));
        let output = cmd.args(["status", "--json"]).output().unwrap();
        assert!(output.status.success());
        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        if report.get("status").and_then(|v| v.as_str()) != Some("not_running") {
            return;
        }
        assert!(Instant::now() < deadline, "wardend did not become ready in time");
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// A fresh `wardend` writes structured startup logs that `warden logs`
/// relays back over the control socket, and `warden status --json` emits a
/// machine-readable report with the daemon's own version string.
#[test]
#[serial]
fn logs_and_json_status_reflect_a_running_daemon() {
    let dir = tempdir().unwrap();

    let mut daemon_cmd = Command::cargo_bin("wardend").expect("wardend binary should be built");
    daemon_cmd.envs(wardend_env(dir.path()));
    let mut child = daemon_cmd.stdout(Stdio::null()).stderr(Stdio::null()).spawn().unwrap();

    wait_for_ready(dir.path());

    let mut status_cmd = Command::cargo_bin("warden").expect("warden binary should be built");
    status_cmd.envs(wardend_env(dir.path()));
    let status_output = status_cmd.args(["status", "--json"]).output().unwrap();
    assert!(status_output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&status_output.stdout).unwrap();
    assert!(report["daemon_version"].is_string());
    assert_eq!(report["sessions"], serde_json::json!([]));

    let mut logs_cmd = Command::cargo_bin("warden").expect("warden binary should be built");
    logs_cmd.envs(wardend_env(dir.path()));
    let logs_output = logs_cmd.args(["logs", "-n", "50"]).output().unwrap();
    assert!(logs_output.status.success());
    let logs_text = String::from_utf8_lossy(&logs_output.stdout);
    assert!(logs_text.contains("wardend starting"), "log tail missing startup line: {logs_text}");

    let mut stop_cmd = Command::cargo_bin("warden").expect("warden binary should be built");
    stop_cmd.envs(wardend_env(dir.path()));
    stop_cmd.arg("stop").output().unwrap();
    let _ = child.wait();
}
