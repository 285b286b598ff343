//! CLI integration tests

use std::io::Write;
use std::process::{Command, Output};

fn realutil(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "realutil-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

const SNAPSHOT: &str = r#"{
    "timestamp": 1700000000,
    "window": {"duration": "15m", "start": 1699999100, "end": 1700000000},
    "source": "Prometheus",
    "data": {
        "node-a": {"metrics": [{"name": "mem", "type": "Memory", "operator": "Latest", "value": 92.5}]},
        "node-b": {"metrics": [{"name": "mem", "type": "Memory", "operator": "Latest", "value": 41.0}]}
    }
}"#;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = realutil(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Real Utilization Descheduler"),
        "Should show app name"
    );
    assert!(stdout.contains("snapshot"), "Should show snapshot command");
    assert!(stdout.contains("plan"), "Should show plan command");
    assert!(stdout.contains("validate"), "Should show validate command");
    assert!(stdout.contains("--watcher-url"), "Should show watcher url option");
    assert!(stdout.contains("--format"), "Should show format option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = realutil(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("realutil"), "Should show binary name");
}

#[test]
fn test_plan_help() {
    let output = realutil(&["plan", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Plan help should succeed");
    assert!(stdout.contains("--target"), "Should show target option");
    assert!(stdout.contains("--policy"), "Should show policy option");
}

#[test]
fn test_snapshot_json_from_watcher() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/watcher")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SNAPSHOT)
        .create();

    let output = realutil(&["--watcher-url", &server.url(), "snapshot", "--format", "json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Snapshot should succeed");
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["source"], "Prometheus");
    assert_eq!(snapshot["data"]["node-a"]["metrics"][0]["value"], 92.5);
    mock.assert();
}

#[test]
fn test_plan_json_marks_overloaded_node() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/watcher")
        .with_status(200)
        .with_body(SNAPSHOT)
        .create();

    let output = realutil(&[
        "--watcher-url",
        &server.url(),
        "--format",
        "json",
        "plan",
        "--target",
        "80",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Plan should succeed");
    let plans: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(plans[0]["node"], "node-a");
    assert_eq!(plans[0]["evict"], true);
    assert_eq!(plans[1]["node"], "node-b");
    assert_eq!(plans[1]["evict"], false);
}

#[test]
fn test_snapshot_fails_on_server_error() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/watcher").with_status(500).create();

    let output = realutil(&["--watcher-url", &server.url(), "snapshot"]);

    assert!(!output.status.success(), "Server error should fail");
}

#[test]
fn test_validate_accepts_policy() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "nodeRealUtilizationThresholds:\n  watcherAddress: http://load-watcher:2020\n  targetMemoryRate: 80\nnamespaces:\n  exclude: [kube-system]\n"
    )
    .unwrap();
    let path = file.path().to_string_lossy().to_string();

    let output = realutil(&["validate", &path, "--format", "json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Valid policy should pass");
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["watcherAddress"], "http://load-watcher:2020");
    assert_eq!(summary["excludeNamespaces"][0], "kube-system");
}

#[test]
fn test_validate_rejects_conflicting_namespaces() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "nodeRealUtilizationThresholds:\n  watcherAddress: http://load-watcher:2020\n  targetMemoryRate: 80\nnamespaces:\n  include: [apps]\n  exclude: [kube-system]\n"
    )
    .unwrap();
    let path = file.path().to_string_lossy().to_string();

    let output = realutil(&["validate", &path]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Conflicting namespaces should fail");
    assert!(stderr.contains("Include/Exclude"));
}

/// Test invalid command
#[test]
fn test_invalid_command() {
    let output = realutil(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

/// Test missing required argument
#[test]
fn test_missing_argument() {
    let output = realutil(&["validate"]);
    assert!(!output.status.success(), "Missing argument should fail");
}
