//! Integration tests for the CLI interface

mod common;

use assert_cmd::Command;
use common::{s3_notification, sqs_event, TestContextBuilder};
use predicates::prelude::*;

fn chunkfan() -> Command {
    let mut cmd = Command::cargo_bin("chunkfan").unwrap();
    for (name, _) in std::env::vars() {
        if name.starts_with("CHUNKFAN_") || name == "OUTPUT_BUCKET" {
            cmd.env_remove(name);
        }
    }
    cmd
}

#[test]
fn test_cli_help_flag() {
    chunkfan()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("plan"));
}

#[test]
fn test_invalid_command() {
    chunkfan()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_plan_prints_ranges() {
    chunkfan()
        .args(["plan", "--size", "25", "--chunk-size", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 chunk(s) for 25 bytes at chunk size 10"))
        .stdout(predicate::str::contains("bytes 0-9 (10 bytes)"))
        .stdout(predicate::str::contains("bytes 10-19 (10 bytes)"))
        .stdout(predicate::str::contains("bytes 20-24 (5 bytes)"));
}

#[test]
fn test_plan_json() {
    let output = chunkfan()
        .args(["plan", "--size", "10", "--chunk-size", "10", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let chunks: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        chunks,
        serde_json::json!([{"ordinal": 0, "start": 0, "end": 9}])
    );
}

#[test]
fn test_plan_rejects_zero_chunk_size() {
    chunkfan()
        .args(["plan", "--size", "10", "--chunk-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than zero"));
}

#[test]
fn test_plan_uses_configured_chunk_size() {
    let ctx = TestContextBuilder::new()
        .unwrap()
        .with_chunk_size(4)
        .build()
        .unwrap();

    chunkfan()
        .arg("--config")
        .arg(&ctx.config_path)
        .args(["plan", "--size", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 chunk(s) for 10 bytes at chunk size 4"));
}

#[test]
fn test_run_and_aggregate() {
    let ctx = TestContextBuilder::new()
        .unwrap()
        .with_chunk_size(10)
        .with_object("input", "data.txt", "the quick brown fox jumps")
        .build()
        .unwrap();

    chunkfan()
        .arg("--config")
        .arg(&ctx.config_path)
        .args(["run", "--bucket", "input", "--key", "data.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"complete\": true"));

    assert!(ctx
        .object_path("results", "results/data.txt-0-9.json")
        .exists());

    chunkfan()
        .arg("--config")
        .arg(&ctx.config_path)
        .args(["aggregate", "--bucket", "input", "--key", "data.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"expectedChunks\": 3"));
}

#[test]
fn test_aggregate_fails_when_chunks_missing() {
    let ctx = TestContextBuilder::new()
        .unwrap()
        .with_object("input", "data.txt", "never processed")
        .build()
        .unwrap();

    chunkfan()
        .arg("--config")
        .arg(&ctx.config_path)
        .args(["aggregate", "--bucket", "input", "--key", "data.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing 2 of 2"));
}

#[test]
fn test_partition_then_drain() {
    let ctx = TestContextBuilder::new()
        .unwrap()
        .with_chunk_size(5)
        .with_object("input", "notes.txt", "a b c d e f")
        .build()
        .unwrap();
    let event = ctx
        .write_file("event.json", &s3_notification("input", "notes.txt"))
        .unwrap();

    chunkfan()
        .arg("--config")
        .arg(&ctx.config_path)
        .arg("partition")
        .arg(&event)
        .assert()
        .success()
        .stdout(predicate::str::contains("input/notes.txt: 11 bytes, 3 chunk(s) dispatched"));

    chunkfan()
        .arg("--config")
        .arg(&ctx.config_path)
        .arg("drain")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 processed"));
}

#[test]
fn test_partition_missing_object_fails() {
    let ctx = TestContextBuilder::new().unwrap().build().unwrap();
    let event = ctx
        .write_file("event.json", &s3_notification("input", "absent.txt"))
        .unwrap();

    chunkfan()
        .arg("--config")
        .arg(&ctx.config_path)
        .arg("partition")
        .arg(&event)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to get object metadata for input/absent.txt"));
}

#[test]
fn test_work_reports_only_retryable_failures() {
    let ctx = TestContextBuilder::new()
        .unwrap()
        .with_object("input", "data.txt", "the quick brown fox")
        .build()
        .unwrap();
    let good = r#"{"bucket":"input","key":"data.txt","chunk":{"start":0,"end":19}}"#;
    let missing = r#"{"bucket":"input","key":"gone.txt","chunk":{"start":0,"end":9}}"#;
    let batch = ctx
        .write_file(
            "batch.json",
            &sqs_event(&[("m-1", good), ("m-2", "garbage"), ("m-3", missing)]),
        )
        .unwrap();

    let output = chunkfan()
        .arg("--config")
        .arg(&ctx.config_path)
        .arg("work")
        .arg(&batch)
        .output()
        .unwrap();
    assert!(output.status.success());

    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        response,
        serde_json::json!({"batchItemFailures": [{"itemIdentifier": "m-3"}]})
    );

    let record = ctx.read_result("results/data.txt-0-19.json").unwrap();
    assert_eq!(record["wordCount"], 4);
}
