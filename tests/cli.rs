use assert_cmd::Command;
use predicates::prelude::*;

fn ytanalyze() -> Command {
    let mut cmd = Command::cargo_bin("ytanalyze").unwrap();
    cmd.env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_types_lists_every_analysis() {
    ytanalyze()
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("summary"))
        .stdout(predicate::str::contains("historical_verification"))
        .stdout(predicate::str::contains("fact_check"));
}

#[test]
fn test_analyze_without_inputs_fails() {
    ytanalyze()
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No inputs given"));
}

#[test]
fn test_analyze_rejects_unknown_type() {
    ytanalyze()
        .args(["analyze", "dQw4w9WgXcQ", "--type", "limerick"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_analyze_with_empty_input_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("videos.txt");
    fs_err::write(&list, "# nothing here\n\n").unwrap();

    ytanalyze()
        .arg("analyze")
        .arg("--from-file")
        .arg(&list)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No inputs given"));
}

#[test]
fn test_help_mentions_subcommands() {
    ytanalyze()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("types"));
}
