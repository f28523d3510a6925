//! End-to-end tests for the `vigil` binary.

use std::io::Write;
use std::net::TcpListener;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn vigil() -> Command {
    let mut cmd = Command::cargo_bin("vigil").unwrap();
    cmd.env_remove("VIGIL_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

#[test]
fn help_lists_subcommands() {
    vigil()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("rules"));
}

#[test]
fn rules_table() {
    vigil()
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("system_unhealthy"))
        .stdout(predicate::str::contains("component_low_success_rate"))
        .stdout(predicate::str::contains("Total: 5 rule(s)"));
}

#[test]
fn rules_json() {
    let output = vigil().args(["--format", "json", "rules"]).output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["rules"].as_array().unwrap().len(), 5);
}

#[test]
fn check_without_config_reports_unknown() {
    vigil()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("System Health: unknown"))
        .stdout(predicate::str::contains("No components configured"));
}

#[test]
fn check_json_with_unreachable_component() {
    let file = config_file(&format!(
        r#"{{ "components": [ {{ "name": "db", "type": "database",
            "probe": {{ "kind": "tcp", "address": "{}" }} }} ] }}"#,
        closed_port()
    ));

    let output = vigil()
        .args(["--format", "json", "check", "--config"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], "unhealthy");
    assert_eq!(value["components"]["db"]["component_type"], "database");
    assert_eq!(value["summary"]["unhealthy_components"], 1);
}

#[test]
fn strict_check_fails_when_unhealthy() {
    let file = config_file(&format!(
        r#"{{ "components": [ {{ "name": "db",
            "probe": {{ "kind": "tcp", "address": "{}" }} }} ] }}"#,
        closed_port()
    ));

    vigil()
        .env("VIGIL_CONFIG", file.path())
        .args(["check", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("system is unhealthy"));
}

#[test]
fn strict_check_passes_when_healthy() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let file = config_file(&format!(
        r#"{{ "components": [ {{ "name": "local",
            "probe": {{ "kind": "tcp", "address": "{}" }} }} ] }}"#,
        listener.local_addr().unwrap()
    ));

    vigil()
        .env("VIGIL_CONFIG", file.path())
        .args(["check", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("System Health: healthy"));
}

#[test]
fn missing_config_file_fails() {
    vigil()
        .args(["--config", "/nonexistent/vigil.json", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn invalid_config_fails() {
    let file = config_file(r#"{ "monitor": { "check_interval_secs": 0 } }"#);

    vigil()
        .arg("--config")
        .arg(file.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("check_interval_secs"));
}

#[test]
fn watch_stops_after_duration() {
    vigil()
        .args(["watch", "--duration", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[cycle] unknown (0 component(s))"));
}
