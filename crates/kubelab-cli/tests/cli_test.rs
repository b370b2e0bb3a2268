//! End-to-end tests of the `kubelab` binary.
//!
//! These run the compiled binary the way a container entrypoint would:
//! 1. Crashloop exit status with and without its configuration
//! 2. Scenario listing
//! 3. Startup failures of HTTP scenarios

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::process::Command;

fn kubelab() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kubelab"));
    let _ = cmd
        .env_remove("REQUIRED_CONFIG")
        .env_remove("CONFIG_PATH")
        .env("RUST_LOG", "info");
    cmd
}

// ── Crashloop ────────────────────────────────────────────────────────

#[test]
fn crashloop_without_config_exits_1() {
    let output = kubelab().arg("crashloop").output().expect("run kubelab");
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Starting application..."), "{stdout}");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: REQUIRED_CONFIG environment variable is not set!"), "{stderr}");
    assert!(stderr.contains("Application cannot start without proper configuration."), "{stderr}");
    assert!(!stdout.contains("environment variable is not set"), "{stdout}");
}

#[test]
fn crashloop_with_empty_config_exits_1() {
    let output = kubelab()
        .arg("crashloop")
        .env("REQUIRED_CONFIG", "")
        .output()
        .expect("run kubelab");
    assert_eq!(output.status.code(), Some(1));
}

// ── Listing ──────────────────────────────────────────────────────────

#[test]
fn scenarios_lists_every_image() {
    let output = kubelab().args(["scenarios", "--contexts"]).output().expect("run kubelab");
    assert!(output.status.success());

    let table = String::from_utf8_lossy(&output.stdout);
    assert_eq!(table.lines().count(), 13);
    assert!(table.contains("vellankikoti/k8s-masterclass-init-wait:v1.0"));
    assert!(table.contains("scenarios/09-pvc-pending/app"));
}

// ── Scenario startup ─────────────────────────────────────────────────

#[test]
fn blog_without_configmap_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = kubelab()
        .args(["serve", "config-app", "--port", "0"])
        .env("CONFIG_PATH", dir.path().join("blog.json"))
        .output()
        .expect("run kubelab");
    assert_eq!(output.status.code(), Some(1));

    let logs = String::from_utf8_lossy(&output.stderr);
    assert!(logs.contains("Make sure the ConfigMap is mounted correctly!"), "{logs}");
}

#[test]
fn unknown_scenario_is_a_usage_error() {
    let output = kubelab().args(["serve", "nginx"]).output().expect("run kubelab");
    assert_eq!(output.status.code(), Some(2));
}
