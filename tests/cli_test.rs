//! Binary-level checks for argument handling and configuration errors

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::temp_config_file;

fn ragstream() -> Command {
    Command::cargo_bin("ragstream").unwrap()
}

#[test]
fn test_help_lists_commands() {
    ragstream()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("smart"))
        .stdout(predicate::str::contains("stats"))
        .stdout(predicate::str::contains("interactive"));
}

#[test]
fn test_zero_top_k_rejected() {
    ragstream()
        .args(["ask", "what?", "-k", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("0"));
}

#[test]
fn test_invalid_config_fails_validation() {
    let (_dir, path) = temp_config_file("pdf:\n  top_k: 0\n");
    ragstream()
        .args(["--config", path.to_str().unwrap(), "search", "rust"])
        .env_remove("RAGSTREAM_PDF_TOP_K")
        .assert()
        .failure()
        .stderr(predicate::str::contains("pdf.top_k must be greater than 0"));
}

#[test]
fn test_bad_api_url_override_rejected() {
    let (_dir, path) = temp_config_file("{}\n");
    ragstream()
        .args([
            "--config",
            path.to_str().unwrap(),
            "--api-url",
            "ftp://example.com",
            "search",
            "rust",
        ])
        .env_remove("RAGSTREAM_API_URL")
        .assert()
        .failure()
        .stderr(predicate::str::contains("endpoints.api_url"));
}

#[test]
fn test_empty_question_prints_warning_without_contacting_server() {
    let (_dir, path) = temp_config_file("endpoints:\n  api_url: http://127.0.0.1:9\n");
    ragstream()
        .args(["--config", path.to_str().unwrap(), "ask", "   "])
        .env_remove("RAGSTREAM_API_URL")
        .assert()
        .success()
        .stdout(predicate::str::contains("Please enter a question"));
}

#[test]
fn test_log_file_receives_logs() {
    let (dir, path) = temp_config_file("endpoints:\n  api_url: http://127.0.0.1:9\n");
    let log = dir.path().join("ragstream.log");
    ragstream()
        .args([
            "--config",
            path.to_str().unwrap(),
            "-v",
            "--log-file",
            log.to_str().unwrap(),
            "ask",
            "   ",
        ])
        .env_remove("RAGSTREAM_API_URL")
        .env_remove("RUST_LOG")
        .assert()
        .success();

    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("Flow finished"));
}
