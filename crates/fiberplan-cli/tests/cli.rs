//! End-to-end runs of the fiberplan binary

use std::path::Path;
use std::process::{Command, Output};

fn fiberplan(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fiberplan"))
        .args(args)
        .output()
        .expect("failed to run fiberplan")
}

fn write_sample(dir: &Path, name: &str) -> String {
    let path = dir.join(format!("{}.json", name));
    let path_str = path.to_str().unwrap().to_string();
    let output = fiberplan(&["sample", name, "--out", &path_str]);
    assert!(output.status.success());
    path_str
}

#[test]
fn test_budget_reports_worked_example() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path(), "worked");

    let output = fiberplan(&["budget", &path]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("-7.745"), "{}", stdout);
    assert!(stdout.contains("20.255"));
    assert!(stdout.contains("GOOD"));
}

#[test]
fn test_budget_tx_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path(), "worked");

    let output = fiberplan(&["budget", &path, "--tx-power", "-15", "--json"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["onus"][0]["status"], "MARGINAL");
}

#[test]
fn test_validate_flags_bad_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path(), "building");
    assert!(fiberplan(&["validate", &path]).status.success());

    let mut diagram: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let mut duplicate = diagram["connections"][0].clone();
    duplicate["id"] = "conn-dup".into();
    diagram["connections"].as_array_mut().unwrap().push(duplicate);
    std::fs::write(&path, diagram.to_string()).unwrap();

    let output = fiberplan(&["validate", &path]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("conn-dup"));
}

#[test]
fn test_splitters_lists_table() {
    let output = fiberplan(&["splitters"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1:32"));
    assert!(stdout.contains("5.2 / 1.5"));
}

#[test]
fn test_unknown_sample_fails() {
    assert!(!fiberplan(&["sample", "ring"]).status.success());
}
