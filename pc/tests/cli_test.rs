//! End-to-end tests for the `pc` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `pc` with logs and config lookups confined to a scratch directory
fn pc(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pc").expect("pc binary");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"));
    cmd
}

// =============================================================================
// classify
// =============================================================================

#[test]
fn test_classify_server_root_with_satellites() {
    let home = TempDir::new().unwrap();
    pc(&home)
        .args(["classify", "--server", "-r", "0", "-n", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ServerRootMPI"));
}

#[test]
fn test_classify_defaults_to_standalone() {
    let home = TempDir::new().unwrap();
    pc(&home)
        .arg("classify")
        .assert()
        .success()
        .stdout(predicate::str::diff("Standalone\n"));
}

#[test]
fn test_classify_json_output() {
    let home = TempDir::new().unwrap();
    let output = pc(&home)
        .args(["classify", "-r", "2", "-n", "3", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["role"], "SatelliteMPI");
    assert_eq!(json["topology"]["num-processes"], 3);
}

#[test]
fn test_classify_non_root_rank_ignores_group_size() {
    let home = TempDir::new().unwrap();
    pc(&home)
        .args(["classify", "-r", "5", "-n", "2"])
        .assert()
        .success()
        .stdout(predicate::str::diff("SatelliteMPI\n"));
}

#[test]
fn test_classify_unknown_format_fails() {
    let home = TempDir::new().unwrap();
    pc(&home)
        .args(["classify", "-f", "table"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown format"));
}

#[test]
fn test_classify_reads_topology_from_config() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("topology.yml");
    std::fs::write(&path, "topology:\n  is-server: true\n  num-processes: 1\n").unwrap();

    pc(&home)
        .args(["-c", path.to_str().unwrap(), "classify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ServerRootSingleProcess"));
}

// =============================================================================
// simulate / config
// =============================================================================

#[test]
fn test_simulate_json_report() {
    let home = TempDir::new().unwrap();
    let output = pc(&home)
        .args([
            "simulate", "-s", "2", "--steps", "3", "--tick-ms", "1", "--interval-ms", "0", "-f", "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["roles"].as_array().map(Vec::len), Some(3));
    assert_eq!(report["roles"][0], "StandaloneMPIRoot");
    assert_eq!(report["satellites"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["root"]["unknown_sources"], 0);
}

#[test]
fn test_config_prints_defaults() {
    let home = TempDir::new().unwrap();
    pc(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("minimum-interval-ms: 500"))
        .stdout(predicate::str::contains("progress-tag: 31415"));
}

#[test]
fn test_missing_config_file_fails() {
    let home = TempDir::new().unwrap();
    pc(&home)
        .args(["-c", "does-not-exist.yml", "config"])
        .assert()
        .failure();
}
