//! CLI integration tests for shapesync.
//!
//! These tests verify command-line argument parsing, help output,
//! exit codes for error conditions, and the offline `render` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the shapesync binary.
fn cmd() -> Command {
    Command::cargo_bin("shapesync").unwrap()
}

const START_PUBLISH: &str = r#"{"source":"Test","entity":"Products","action":"START_PUBLISH","shape":{"keyNames":["ID"],"properties":["ID:integer","Name:string","Price:float"],"propertyNames":{"Name":"Product Name"}}}"#;
const UPSERT: &str = r#"{"source":"Test","entity":"Products","action":"UPSERT","shape":{"keyNames":["ID"],"properties":["ID:integer","Name:string","Price:float"]},"data":{"ID":1,"Name":"Widget","Price":9.5},"meta":{"publisher":"erp","publishedAt":"2018-06-01T12:30:00Z","shapeVersion":"3"}}"#;

fn input_file(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("receive"))
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_receive_subcommand_help() {
    cmd()
        .args(["receive", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--input"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("shapesync"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_output_json_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_1() {
    // Missing file is an IO error
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_required_fields_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "target:").unwrap();
    writeln!(file, "  port: 3306").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "receive"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("target.host is required"));
}

// =============================================================================
// Render Tests
// =============================================================================

#[test]
fn test_render_prints_ddl_and_upsert() {
    let file = input_file(&[START_PUBLISH, "", UPSERT]);

    cmd()
        .args(["render", "--input", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE IF NOT EXISTS `Test.Products` ("))
        .stdout(predicate::str::contains("\t`ID` INT(10) NOT NULL,"))
        .stdout(predicate::str::contains("\tPRIMARY KEY (`ID`)"))
        .stdout(predicate::str::contains("CREATE OR REPLACE VIEW `Products_VIEW` ("))
        .stdout(predicate::str::contains("\t`Product Name`,"))
        .stdout(predicate::str::contains("INSERT INTO `Test.Products` (`ID`, `Name`, `Price`,"))
        .stdout(predicate::str::contains(
            r#"-- params: [1,"Widget",9.5,"erp","2018-06-01 12:30:00","3"]"#,
        ))
        .stdout(predicate::str::contains("-- 2 records, 2 migration statements, 1 upserts"));
}

#[test]
fn test_render_json_output() {
    let file = input_file(&[START_PUBLISH, UPSERT]);

    cmd()
        .args(["--output-json", "render", "--input", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["))
        .stdout(predicate::str::contains("\"sql\": \"CREATE TABLE"))
        .stdout(predicate::str::contains("\"params\""));
}

#[test]
fn test_render_reads_stdin() {
    cmd()
        .arg("render")
        .write_stdin(format!("{}\n", START_PUBLISH))
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE `Test.Products`"));
}

#[test]
fn test_render_rejects_upsert_before_start_publish() {
    let file = input_file(&[UPSERT]);

    cmd()
        .args(["render", "--input", file.path().to_str().unwrap()])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("incompatible"));
}

#[test]
fn test_render_rejects_invalid_json() {
    let file = input_file(&["{not json"]);

    cmd()
        .args(["render", "--input", file.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("JSON error"));
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
