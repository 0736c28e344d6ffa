use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn yamlhouse() -> Command {
    let mut cmd = Command::cargo_bin("yamlhouse").expect("yamlhouse binary");
    cmd.env("RUST_LOG", "error");
    cmd
}

fn write_config(dir: &Path, services: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    let body = format!(
        "repository:\n  path: tree\n  url: {}\nservices:\n{services}",
        dir.join("missing-remote.git").display()
    );
    fs::write(&path, body).unwrap();
    path
}

const TWO_SERVICES: &str = "  - kind: asana
    api_key: literal-token
  - kind: jira
    name: work
    base_uri: https://example.atlassian.net/rest/api/2
    email: me@example.com
    api_key: literal-key
";

#[test]
fn services_lists_index_name_and_kind() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), TWO_SERVICES);

    yamlhouse()
        .args(["services", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("asana"))
        .stdout(predicate::str::contains("work"))
        .stdout(predicate::str::contains("jira"));
}

#[test]
fn services_with_empty_list_says_so() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "  []\n");

    yamlhouse()
        .args(["services", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("No services configured."));
}

#[test]
fn missing_config_fails_with_path() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("nope.yaml");

    yamlhouse()
        .args(["sync", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"))
        .stderr(predicate::str::contains("nope.yaml"));
}

#[test]
fn unknown_service_kind_is_rejected_before_sync() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "  - kind: trello\n");

    yamlhouse()
        .args(["sync", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown service 'trello'"));
    assert!(!tmp.path().join("tree").exists());
}

#[test]
fn unreachable_remote_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), TWO_SERVICES);

    yamlhouse()
        .args(["sync", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot prepare working tree"));
}

#[test]
fn dry_run_and_push_conflict() {
    yamlhouse()
        .args(["sync", "--dry-run", "--push"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
