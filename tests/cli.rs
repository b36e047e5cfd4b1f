use assert_cmd::Command;
use predicates::str::contains;

fn tally() -> Command {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    // keep host configuration out of the test environment
    cmd.env_remove("TALLY_FORMAT")
        .env_remove("TALLY_FAIL_LEVEL")
        .env_remove("TALLY_EXCLUDE")
        .env_remove("TALLY_INCLUDE");
    cmd
}

#[test]
fn prints_help() {
    tally().arg("--help").assert().success().stdout(contains("Usage"));
}

#[test]
fn list_rules_shows_namespaced_codes() {
    tally()
        .arg("list-rules")
        .assert()
        .success()
        .stdout(contains("hadolint/DL3027"))
        .stdout(contains("tally/no-unreachable-stages"));
}

#[test]
fn list_rules_json_is_parseable() {
    let output = tally().args(["list-rules", "--json"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value.as_array().unwrap().len() >= 10);
}

#[test]
fn lint_clean_file_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Dockerfile");
    std::fs::write(&file, "FROM alpine:3.18\nRUN echo ok\n").unwrap();

    tally()
        .args(["lint", file.to_str().unwrap(), "--no-color"])
        .assert()
        .success()
        .stdout(contains("no issues found"));
}

#[test]
fn lint_violations_exit_one_at_default_fail_level() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Dockerfile");
    std::fs::write(&file, "FROM ubuntu:22.04\nMAINTAINER me\n").unwrap();

    tally()
        .args(["lint", file.to_str().unwrap(), "--no-color"])
        .assert()
        .code(1)
        .stdout(contains("buildkit/MaintainerDeprecated"));
}

#[test]
fn fail_level_error_tolerates_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Dockerfile");
    std::fs::write(&file, "FROM ubuntu:22.04\nMAINTAINER me\n").unwrap();

    tally()
        .args(["lint", file.to_str().unwrap(), "--fail-level", "error", "--no-color"])
        .assert()
        .success();
}

#[test]
fn json_format_emits_violations() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Dockerfile");
    std::fs::write(&file, "FROM ubuntu:22.04\nMAINTAINER me\n").unwrap();

    let output = tally()
        .args(["lint", file.to_str().unwrap(), "--format", "json"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["total_violations"].as_u64().unwrap(), 1);
}

#[test]
fn fix_rewrites_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Dockerfile");
    std::fs::write(&file, "FROM ubuntu:22.04\nRUN apt install -y curl\n").unwrap();

    tally()
        .args(["lint", file.to_str().unwrap(), "--fix", "--no-color"])
        .assert()
        .code(1);

    let rewritten = std::fs::read_to_string(&file).unwrap();
    assert_eq!(rewritten, "FROM ubuntu:22.04\nRUN apt-get install -y curl\n");
}

#[test]
fn missing_paths_are_an_error() {
    let dir = tempfile::tempdir().unwrap();
    tally()
        .args(["lint", dir.path().to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(contains("no Dockerfiles found"));
}

#[test]
fn directory_discovery_finds_nested_dockerfiles() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("svc");
    std::fs::create_dir(&nested).unwrap();
    std::fs::write(nested.join("api.Dockerfile"), "FROM alpine:3.18\n").unwrap();

    tally()
        .args(["lint", dir.path().to_str().unwrap(), "--no-color"])
        .assert()
        .success()
        .stdout(contains("no issues found"));
}

#[test]
fn config_file_can_disable_a_rule() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Dockerfile");
    std::fs::write(&file, "FROM ubuntu:22.04\nMAINTAINER me\n").unwrap();
    let config = dir.path().join("tally.toml");
    std::fs::write(&config, "exclude = [\"buildkit/*\"]\n").unwrap();

    // MAINTAINER is the only finding here and its rule is excluded
    tally()
        .args([
            "lint",
            file.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--no-color",
        ])
        .assert()
        .success()
        .stdout(contains("no issues found"));
}
