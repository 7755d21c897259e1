// ABOUTME: Integration tests for the caravel CLI commands.
// ABOUTME: Validates --help output and init command behavior.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn caravel_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("caravel"))
}

#[test]
fn help_shows_commands() {
    caravel_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("caravel.yml");

    caravel_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--service", "demo-app"])
        .assert()
        .success();

    assert!(config_path.exists(), "caravel.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("service: demo-app"));
    assert!(content.contains("region:"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("caravel.yml");

    fs::write(&config_path, "service: existing").unwrap();

    caravel_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_force_overwrites() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("caravel.yml");

    fs::write(&config_path, "service: existing").unwrap();

    caravel_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--force", "--service", "replacement"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("service: replacement"));
}

#[test]
fn init_rejects_invalid_service_name() {
    let temp_dir = tempfile::tempdir().unwrap();

    caravel_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--service", "Not_Valid"])
        .assert()
        .failure();
}

#[test]
fn deploy_without_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    caravel_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "--mode", "local"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn quiet_and_json_conflict() {
    let temp_dir = tempfile::tempdir().unwrap();

    caravel_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "--quiet", "--json"])
        .assert()
        .failure();
}

#[test]
fn status_masks_env_sourced_values() {
    let temp_dir = tempfile::tempdir().unwrap();
    let yaml = concat!(
        "service: demo-app\n",
        "env:\n",
        "  GREETING: hello\n",
        "  API_KEY:\n",
        "    env: DEMO_API_KEY\n",
        "    default: super-secret\n",
    );
    fs::write(temp_dir.path().join("caravel.yml"), yaml).unwrap();

    caravel_cmd()
        .current_dir(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("GREETING: hello"))
        .stdout(predicate::str::contains("API_KEY: ***"))
        .stdout(predicate::str::contains("super-secret").not());
}
