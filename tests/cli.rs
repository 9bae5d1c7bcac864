mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::TestWorkspace;
use predicates::prelude::*;

#[test]
fn probe_reports_the_chosen_strategy_and_columns() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", "Order ID,amount\n1,10\n2,20\n");

    cargo_bin_cmd!("datadock")
        .args(["probe", "-i", input.to_str().unwrap(), "--count"])
        .assert()
        .success()
        .stdout(predicate::str::contains("strategy:"))
        .stdout(predicate::str::contains("Order_ID"))
        .stdout(predicate::str::contains("row count: 2"));
}

#[test]
fn probe_fails_helpfully_on_an_empty_file() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("empty.csv", "");

    cargo_bin_cmd!("datadock")
        .args(["probe", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing strategy"));
}

#[test]
fn convert_writes_a_readable_parquet_file() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", "id,name\n1,alpha\n2,beta\n");
    let output = workspace.path().join("sales.parquet");

    cargo_bin_cmd!("datadock")
        .args([
            "convert",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let (columns, rows) = datadock::convert::read_parquet_summary(&output).expect("summary");
    assert_eq!(columns, vec!["id", "name"]);
    assert_eq!(rows, 2);
}

#[test]
fn ingest_prints_a_ready_terminal_record() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", "id,name\n1,alpha\n2,beta\n3,gamma\n");
    let store = workspace.path().join("blobs");

    cargo_bin_cmd!("datadock")
        .args([
            "ingest",
            "-i",
            input.to_str().unwrap(),
            "--store",
            store.to_str().unwrap(),
            "--owner",
            "cli-user",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"ready\""))
        .stdout(predicate::str::contains("\"row_count\": 3"));
}
