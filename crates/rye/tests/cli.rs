use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_source(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write source");
    file
}

#[test]
fn tokens_dumps_one_token_per_line() {
    let source = write_source("var x = -1;\n");
    Command::cargo_bin("rye")
        .unwrap()
        .arg("tokens")
        .arg(source.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("keyword var")
                .and(predicate::str::contains("identifier x"))
                .and(predicate::str::contains("integer -1"))
                .and(predicate::str::contains("punctuator ;")),
        );
}

#[test]
fn check_reports_token_count() {
    let source = write_source("1 + 2 // comment\n");
    Command::cargo_bin("rye")
        .unwrap()
        .arg("check")
        .arg(source.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ok, 3 tokens"));
}

#[test]
fn check_renders_a_diagnostic_and_fails() {
    let source = write_source("var s = \"unterminated\n");
    Command::cargo_bin("rye")
        .unwrap()
        .arg("check")
        .arg(source.path())
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("string literal unclosed")
                .and(predicate::str::contains(":1:")),
        );
}

#[test]
fn lexer_flags_are_honored() {
    let source = write_source("var\n");
    Command::cargo_bin("rye")
        .unwrap()
        .arg("tokens")
        .arg(source.path())
        .arg("--keyword-as-identifier")
        .assert()
        .success()
        .stdout(predicate::str::contains("identifier var"));

    let source = write_source("42\n");
    Command::cargo_bin("rye")
        .unwrap()
        .arg("tokens")
        .arg(source.path())
        .arg("--integer-as-real")
        .assert()
        .success()
        .stdout(predicate::str::contains("real 42.0"));
}

#[test]
fn missing_file_is_an_error() {
    Command::cargo_bin("rye")
        .unwrap()
        .arg("check")
        .arg("no_such_file.rye")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}
