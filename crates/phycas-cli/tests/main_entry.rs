//! Integration tests for the `phycas` binary entry point.

use std::fs;
use std::net::TcpListener;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn invalid_backend_socket_is_rejected() {
    let mut command = cargo_bin_cmd!("phycas");
    command.args(["--backend-socket", "bogus://backend"]);
    command
        .assert()
        .failure()
        .stderr(contains("failed to load configuration"));
}

#[test]
fn missing_backend_exits_with_failure() {
    let port = TcpListener::bind(("127.0.0.1", 0))
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("reserve a port");
    let mut command = cargo_bin_cmd!("phycas");
    command
        .args(["--backend-socket", &format!("tcp://127.0.0.1:{port}")])
        .write_stdin("");
    command
        .assert()
        .failure()
        .stderr(contains("An error has occurred in the socket"));
}

#[test]
fn malformed_command_language_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("language.json");
    fs::write(&path, "{\"commands\": [").expect("write language");
    let mut command = cargo_bin_cmd!("phycas");
    command.arg("--command-language").arg(&path);
    command
        .assert()
        .failure()
        .stderr(contains("failed to load command language"));
}
