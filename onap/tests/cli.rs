use std::io::Write;

use assert_cmd::Command as AssertCmd;
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::NamedTempFile;

const BULK_PATH: &str = "/aai/v27/bulk";

fn operations_file(operations: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{operations}").unwrap();
    file
}

fn onap_aai_bulk(server: &Server, file: &NamedTempFile) -> AssertCmd {
    let mut cmd = AssertCmd::cargo_bin("onap").unwrap();
    cmd.args(["aai", "bulk", "--aai-url"])
        .arg(server.url())
        .arg("--file")
        .arg(file.path())
        .env("LOG_FILTER", "info")
        .timeout(std::time::Duration::from_secs(30));
    cmd
}

fn stdout_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8(stdout.to_vec())
        .expect("must be able to convert output to String")
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn complex(name: &str) -> Value {
    json!({
        "action": "put",
        "uri": format!("/cloud-infrastructure/complexes/complex/{name}"),
        "body": {"physical-location-id": name, "physical-location-type": "office"},
    })
}

fn accepted(name: &str) -> Value {
    json!({
        "action": "put",
        "uri": format!("/cloud-infrastructure/complexes/complex/{name}"),
        "response-status-code": 201,
        "response-body": null,
    })
}

#[test_log::test]
fn bulk_prints_outcomes() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", BULK_PATH)
        .match_header("Authorization", "Basic QUFJOkFBSQ==")
        .match_body(Matcher::Json(json!({
            "operations": [complex("c1"), complex("c2")],
        })))
        .with_status(201)
        .with_body(json!({"operation-responses": [accepted("c1"), accepted("c2")]}).to_string())
        .create();

    let file = operations_file(&json!([complex("c1"), complex("c2")]));
    let output = onap_aai_bulk(&server, &file)
        .assert()
        .success()
        .get_output()
        .clone();

    assert_eq!(
        stdout_lines(&output.stdout),
        vec![accepted("c1"), accepted("c2")]
    );
    mock.assert();
}

#[test_log::test]
fn bulk_drops_rejected_operation() {
    let mut server = Server::new();
    let rejected = server
        .mock("POST", BULK_PATH)
        .match_body(Matcher::Json(json!({
            "operations": [complex("c1"), complex("c2")],
        })))
        .with_status(400)
        .with_body(
            "Invalid input performing %1 on %2:Error with operation 1: Missing required property",
        )
        .create();
    let retried = server
        .mock("POST", BULK_PATH)
        .match_body(Matcher::Json(json!({"operations": [complex("c1")]})))
        .with_status(201)
        .with_body(json!({"operation-responses": [accepted("c1")]}).to_string())
        .create();

    let file = operations_file(&json!([complex("c1"), complex("c2")]));
    let output = onap_aai_bulk(&server, &file)
        .assert()
        .success()
        .get_output()
        .clone();

    assert_eq!(stdout_lines(&output.stdout), vec![accepted("c1")]);
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(
        stderr.contains(r#""uri": "/cloud-infrastructure/complexes/complex/c2""#),
        "dropped operation missing from stderr: {stderr}"
    );
    rejected.assert();
    retried.assert();
}

#[test_log::test]
fn bulk_keep_failed_stops_on_rejection() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", BULK_PATH)
        .with_status(400)
        .with_body("Error with operation 0: Missing required property")
        .expect(1)
        .create();

    let file = operations_file(&json!([complex("c1"), complex("c2")]));
    let output = onap_aai_bulk(&server, &file)
        .arg("--keep-failed")
        .assert()
        .failure()
        .code(1)
        .get_output()
        .clone();

    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(
        stderr.contains("A&AI command failed: server responded with error [400 Bad Request]"),
        "unexpected stderr: {stderr}"
    );
    mock.assert();
}

#[test_log::test]
fn bulk_rejects_invalid_file() {
    let mut server = Server::new();
    let mock = server.mock("POST", BULK_PATH).expect(0).create();

    let file = operations_file(&json!({"action": "put"}));
    let output = onap_aai_bulk(&server, &file)
        .assert()
        .failure()
        .get_output()
        .clone();

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(
        stderr.contains("invalid operations file"),
        "unexpected stderr: {stderr}"
    );
    mock.assert();
}
