//! Integration tests for the `ttp` binary entry point.

use std::time::{Duration, Instant};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::{contains, starts_with};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn missing_subcommand_exits_with_failure() {
    let mut command = cargo_bin_cmd!("ttp");
    command.assert().failure().stderr(contains("Usage"));
}

#[test]
fn unreadable_record_is_reported() {
    let dir = TempDir::new().expect("temp dir");
    let mut command = cargo_bin_cmd!("ttp");
    command
        .args(["daemon", "stop", "--json"])
        .arg(dir.path().join("absent.json"));
    command
        .assert()
        .failure()
        .stderr(starts_with("ttp: failed to read configuration"));
}

#[test]
fn disabled_daemon_is_not_started() {
    let dir = TempDir::new().expect("temp dir");
    let record = dir.path().join("backup.json");
    std::fs::write(
        &record,
        json!({ "enabled": false, "listeningPort": 4100, "execPath": "/bin/sh" }).to_string(),
    )
    .expect("write record");

    let mut command = cargo_bin_cmd!("ttp");
    command.args(["daemon", "start", "--json"]).arg(&record);
    command
        .assert()
        .failure()
        .stderr(contains("daemon is disabled"));
}

#[cfg(unix)]
#[test]
fn start_launches_exec_path_detached() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("temp dir");
    let seen = dir.path().join("argv");
    let exec = dir.path().join("fake-daemon");
    std::fs::write(
        &exec,
        format!("#!/bin/sh\necho \"$@\" > '{}.tmp'\nmv '{0}.tmp' '{0}'\n", seen.display()),
    )
    .expect("write fake daemon");
    std::fs::set_permissions(&exec, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    let record = dir.path().join("backup.json");
    std::fs::write(
        &record,
        json!({ "listeningPort": 4101, "execPath": exec.to_str().expect("utf-8") }).to_string(),
    )
    .expect("write record");

    let mut command = cargo_bin_cmd!("ttp");
    command
        .args(["daemon", "start", "--json"])
        .arg(&record)
        .args(["--", "--lenient"]);
    command
        .assert()
        .success()
        .stdout(starts_with("started backup (pid "));

    let deadline = Instant::now() + Duration::from_secs(10);
    while !seen.exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    let argv = std::fs::read_to_string(&seen).expect("fake daemon ran");
    assert_eq!(
        argv.trim_end(),
        format!("--json {} --ignore-int --lenient", record.display())
    );
}
