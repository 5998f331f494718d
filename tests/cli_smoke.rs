use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

const GRID: &str = r#"{
    "scale": {"min": 1, "max": 7},
    "elements": ["self", "mother", "father", "friend", "partner", "ideal self"],
    "constructs": [
        {"left": "shy", "right": "outgoing"},
        {"left": "kind", "right": "cruel"},
        {"left": "patient", "right": "restless"},
        {"left": "tidy", "right": "messy"}
    ],
    "ratings": [
        [2, 6, 3, 5, 2, 6],
        [6, 2, 5, 3, 6, 7],
        [5, 4, 6, 3, 3, 5],
        [4, 1, 7, 2, 6, 4]
    ]
}"#;

fn write_grid(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("grid.json");
    std::fs::write(&path, GRID).unwrap();
    path
}

#[test]
fn all_indices_to_json_file() {
    let dir = tempdir().unwrap();
    let grid = write_grid(dir.path());
    let out = dir.path().join("report.json");

    let status = Command::new(env!("CARGO_BIN_EXE_repgrid"))
        .arg("all")
        .arg("--grid")
        .arg(&grid)
        .args(["--format", "json"])
        .arg("--out")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let raw = std::fs::read_to_string(&out).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["grid_hash"].as_str().unwrap().len(), 64);
    assert_eq!(value["constructs"], 4);
    let reports = value["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 8);
    assert_eq!(reports[0]["index"], "bias");
    assert_eq!(reports[7]["index"], "dilemma");
    assert_eq!(reports[7]["result"]["dilemmas"].as_array().unwrap().len(), 1);
}

#[test]
fn text_report_to_stdout_uses_config_file() {
    let dir = tempdir().unwrap();
    let grid = write_grid(dir.path());
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"digits": 4, "conflict": {"crit": 0.1}}"#).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_repgrid"))
        .arg("conflict2")
        .arg("--grid")
        .arg(&grid)
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("## Conflict (magnitude balance of triads)"));
    assert!(stdout.contains("Tolerance (crit): 0.1"));
}

#[test]
fn unsupported_dilemma_mode_fails() {
    let dir = tempdir().unwrap();
    let grid = write_grid(dir.path());
    let output = Command::new(env!("CARGO_BIN_EXE_repgrid"))
        .arg("dilemma")
        .arg("--grid")
        .arg(&grid)
        .args(["--mode", "7"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unsupported difference mode 7"));
}

#[test]
fn malformed_grid_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("grid.json");
    std::fs::write(&path, r#"{"scale": {"min": 1, "max": 5}}"#).unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_repgrid"))
        .arg("bias")
        .arg("--grid")
        .arg(&path)
        .status()
        .unwrap();
    assert!(!status.success());
}
