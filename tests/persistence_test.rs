#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: import two activities
    let csv1 = dir.path().join("first.csv");
    common::generate_activities_csv(&csv1, &["Fly a kite", "Plant a tree"]).unwrap();

    let mut cmd1 = Command::new(cargo_bin!("thingstodo"));
    cmd1.arg("--db-path").arg(&db_path).arg("import-activities").arg(&csv1);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    assert!(String::from_utf8_lossy(&output1.stdout).contains("Imported 2 activities, catalog has 2"));

    // 2. Second run: one known title is upserted, one is new
    let csv2 = dir.path().join("second.csv");
    common::generate_activities_csv(&csv2, &["Plant a tree", "Swim with dolphins"]).unwrap();

    let mut cmd2 = Command::new(cargo_bin!("thingstodo"));
    cmd2.arg("--db-path").arg(&db_path).arg("import-activities").arg(&csv2);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    assert!(String::from_utf8_lossy(&output2.stdout).contains("Imported 2 activities, catalog has 3"));
}
