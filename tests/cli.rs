// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Command-line behaviour of the flowpack binary

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;

fn flowpack() -> Command {
    let mut cmd = Command::cargo_bin("flowpack").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_empty_file_flag_is_rejected() {
    flowpack()
        .args(["compile", "--file", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be empty"));
}

#[test]
fn test_missing_file_flag_is_rejected() {
    flowpack().arg("compile").assert().failure();
}

#[test]
fn test_compile_valid_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let path = base_bundle()
        .record("wf/a.json", doubling_workflow("a"))
        .write_to(dir.path(), "bundle.tgz");

    flowpack()
        .arg("compile")
        .arg("--file")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 workflow(s)"))
        .stdout(predicate::str::contains("Digest:"));
}

#[test]
fn test_compile_writes_json_closure() {
    let dir = tempfile::tempdir().unwrap();
    let path = base_bundle()
        .record("wf/a.json", doubling_workflow("a"))
        .write_to(dir.path(), "bundle.tgz");
    let out = dir.path().join("closure.json");

    flowpack()
        .arg("compile")
        .arg("--file")
        .arg(&path)
        .args(["--format", "json", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"order\""));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["order"].as_array().unwrap().len(), 3);
}

#[test]
fn test_compile_reports_every_defect() {
    let dir = tempfile::tempdir().unwrap();
    let bad = workflow(
        "bad",
        &[("x", "integer")],
        &[],
        vec![
            node("n0", "task", "double", vec![from_input("x", "x")]),
            node("n1", "task", "greet", vec![from_node("name", "n0", "o")]),
        ],
        vec![],
    );
    let path = base_bundle()
        .record("wf/bad.json", bad)
        .raw("tasks/broken.json", b"{ not json")
        .write_to(dir.path(), "bundle.tgz");

    flowpack()
        .arg("compile")
        .arg("--file")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 defect(s) found"))
        .stderr(predicate::str::contains("tasks/broken.json"))
        .stderr(predicate::str::contains("expects string but is bound to integer"));
}

#[test]
fn test_compile_missing_bundle() {
    let dir = tempfile::tempdir().unwrap();
    flowpack()
        .current_dir(dir.path())
        .args(["compile", "--file", "absent.tgz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_graph_mermaid() {
    let dir = tempfile::tempdir().unwrap();
    base_bundle()
        .record("wf/a.json", doubling_workflow("a"))
        .write_to(dir.path(), "bundle.tgz");

    flowpack()
        .args(["-C"])
        .arg(dir.path())
        .args(["graph", "--file", "bundle.tgz", "--workflow", "a", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("graph TD"))
        .stdout(predicate::str::contains("n0 -->|o → x| n1"));
}

#[test]
fn test_graph_unknown_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let path = base_bundle()
        .record("wf/a.json", doubling_workflow("a"))
        .write_to(dir.path(), "bundle.tgz");

    flowpack()
        .arg("graph")
        .arg("--file")
        .arg(&path)
        .args(["--workflow", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Available workflows: a"));
}
