//! End-to-end tests driving the cfmlint binary against a stub engine.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

/// Writes an executable shell script standing in for the external engine.
fn write_stub_engine(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("stub-engine.sh");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// A stub that reports one issue at the given line of the scanned file.
fn issue_emitting_engine(dir: &Path, line: usize) -> PathBuf {
    let body = format!(
        r#"file="$1"
cat <<EOF
<?xml version="1.0" encoding="UTF-8" ?>
<issues version="1.0">
<issue id="STUB_RULE" severity="ERROR" message="stub"><location file="$file" line="{}" column="1" message="stub finding"/></issue>
</issues>
EOF"#,
        line
    );
    write_stub_engine(dir, &body)
}

fn cfmlint() -> Command {
    Command::cargo_bin("cfmlint").unwrap()
}

#[test]
fn analyze_reports_located_issues_and_summary() {
    let project = tempfile::tempdir().unwrap();
    fs::write(project.path().join("page.cfm"), "<cfset x = 1>\n<p>hi</p>\n").unwrap();
    let engine = issue_emitting_engine(project.path(), 1);

    cfmlint()
        .current_dir(project.path())
        .arg("analyze")
        .arg("page.cfm")
        .arg("--engine")
        .arg(&engine)
        .assert()
        .success()
        .stdout(predicate::str::contains("STUB_RULE"))
        .stdout(predicate::str::contains("stub finding"))
        .stdout(predicate::str::contains("1 succeeded"));
}

#[test]
fn analyze_resolves_virtual_lines_into_included_files() {
    let project = tempfile::tempdir().unwrap();
    // Root: 3 lines, include directive on line 3. Part: 5 lines. An issue at
    // virtual line 5 of the root lands on part.cfm line 2.
    fs::write(
        project.path().join("root.cfm"),
        "one\ntwo\n<cfinclude template=\"part.cfm\">\n",
    )
    .unwrap();
    fs::write(project.path().join("part.cfm"), "a\nb\nc\nd\ne\n").unwrap();
    let engine = issue_emitting_engine(project.path(), 5);

    cfmlint()
        .current_dir(project.path())
        .arg("analyze")
        .arg("root.cfm")
        .arg("part.cfm")
        .arg("--engine")
        .arg(&engine)
        .assert()
        .success()
        .stdout(predicate::str::contains("part.cfm"))
        .stdout(predicate::str::contains("from included file: part.cfm"));
}

#[test]
fn failing_engine_is_tolerated_by_default() {
    let project = tempfile::tempdir().unwrap();
    fs::write(project.path().join("page.cfm"), "<cfset x = 1>\n").unwrap();
    let engine = write_stub_engine(project.path(), "echo 'engine exploded' >&2\nexit 3");

    cfmlint()
        .current_dir(project.path())
        .arg("analyze")
        .arg("page.cfm")
        .arg("--engine")
        .arg(&engine)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 failed"));
}

#[test]
fn failing_engine_fails_run_when_malformed_files_are_not_skipped() {
    let project = tempfile::tempdir().unwrap();
    fs::write(project.path().join("page.cfm"), "<cfset x = 1>\n").unwrap();
    fs::write(
        project.path().join(".cfmlint.json"),
        r#"{ "skip_malformed_files": false }"#,
    )
    .unwrap();
    let engine = write_stub_engine(project.path(), "exit 3");

    cfmlint()
        .current_dir(project.path())
        .arg("analyze")
        .arg("page.cfm")
        .arg("--engine")
        .arg(&engine)
        .assert()
        .failure();
}

#[test]
fn strict_mode_fails_fast_on_engine_failure() {
    let project = tempfile::tempdir().unwrap();
    fs::write(project.path().join("page.cfm"), "<cfset x = 1>\n").unwrap();
    let engine = write_stub_engine(project.path(), "exit 3");

    cfmlint()
        .current_dir(project.path())
        .arg("analyze")
        .arg("page.cfm")
        .arg("--engine")
        .arg(&engine)
        .arg("--mode")
        .arg("strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("strict"));
}

#[test]
fn json_format_emits_machine_readable_output() {
    let project = tempfile::tempdir().unwrap();
    fs::write(project.path().join("page.cfm"), "<cfset x = 1>\n").unwrap();
    let engine = issue_emitting_engine(project.path(), 1);

    cfmlint()
        .current_dir(project.path())
        .arg("analyze")
        .arg("page.cfm")
        .arg("--engine")
        .arg(&engine)
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rule_id\": \"STUB_RULE\""))
        .stdout(predicate::str::contains("\"issues_created\": 1"));
}

#[test]
fn init_writes_config_and_refuses_overwrite() {
    let project = tempfile::tempdir().unwrap();

    cfmlint()
        .current_dir(project.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created .cfmlint.jsonc"));

    assert!(project.path().join(".cfmlint.jsonc").exists());

    cfmlint()
        .current_dir(project.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}
