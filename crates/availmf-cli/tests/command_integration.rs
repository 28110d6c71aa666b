//! Integration tests driving the built binary end-to-end.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn init_writes_cluster_toml() {
    let dir = TempDir::new().unwrap();
    let cluster_dir = dir.path().join("cluster");

    Command::cargo_bin("availmf")
        .unwrap()
        .args(["init", cluster_dir.to_str().unwrap(), "--nodes", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("node 0"));

    assert!(cluster_dir.join("cluster.toml").exists());
}

#[test]
fn init_twice_fails() {
    let dir = TempDir::new().unwrap();
    let cluster_dir = dir.path().join("cluster");

    Command::cargo_bin("availmf").unwrap().args(["init", cluster_dir.to_str().unwrap()]).assert().success();

    Command::cargo_bin("availmf")
        .unwrap()
        .args(["init", cluster_dir.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already has"));
}

#[test]
fn status_reports_topology_for_a_valid_node() {
    let dir = TempDir::new().unwrap();
    let cluster_dir = dir.path().join("cluster");

    Command::cargo_bin("availmf").unwrap().args(["init", cluster_dir.to_str().unwrap(), "--nodes", "2"]).assert().success();

    Command::cargo_bin("availmf")
        .unwrap()
        .args(["status", cluster_dir.to_str().unwrap(), "--node", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("node 0"));
}

#[test]
fn status_rejects_an_unknown_node() {
    let dir = TempDir::new().unwrap();
    let cluster_dir = dir.path().join("cluster");

    Command::cargo_bin("availmf").unwrap().args(["init", cluster_dir.to_str().unwrap(), "--nodes", "1"]).assert().success();

    Command::cargo_bin("availmf")
        .unwrap()
        .args(["status", cluster_dir.to_str().unwrap(), "--node", "9"])
        .assert()
        .failure();
}

#[test]
fn status_without_init_fails() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("availmf").unwrap().args(["status", dir.path().to_str().unwrap(), "--node", "0"]).assert().failure();
}
