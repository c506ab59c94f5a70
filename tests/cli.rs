use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn lumen() -> Command {
    Command::cargo_bin("lumen").expect("binary exists")
}

#[test]
fn lumen_run_quickstart() {
    lumen()
        .arg("run")
        .arg("demos/quickstart.lm")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello from Lumen!"))
        .stdout(predicate::str::contains("5 ! = 120"));
}

#[test]
fn lumen_run_shapes() {
    lumen()
        .arg("run")
        .arg("demos/shapes.lm")
        .assert()
        .success()
        .stdout(predicate::str::contains("rect with area 6 perimeter 10"))
        .stdout(predicate::str::contains("square! rect with area 25"));
}

#[test]
fn lumen_eval_prints_value() {
    lumen()
        .arg("eval")
        .arg("1 + 2 + 3")
        .assert()
        .success()
        .stdout("6\n");
}

#[test]
fn failing_script_exits_nonzero_with_caret() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("bad.lm");
    fs::write(&script, "let a = 1\nprint(a / 0)\n").expect("write script");

    lumen()
        .arg("run")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E0301]: division by zero"))
        .stderr(predicate::str::contains("2 | print(a / 0)"))
        .stderr(predicate::str::contains("^^^^^"));
}

#[test]
fn json_flag_emits_structured_diagnostic() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("typo.lm");
    fs::write(&script, "let count = 1\nprint(cont)\n").expect("write script");

    lumen()
        .arg("run")
        .arg("--json")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""code":"E0401""#))
        .stderr(predicate::str::contains("did you mean `count`?"));
}

#[test]
fn step_limit_flag_stops_infinite_loop() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("spin.lm");
    fs::write(&script, "while true { }\n").expect("write script");

    lumen()
        .arg("run")
        .arg("--max-steps")
        .arg("100")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("E0307"));
}

#[test]
fn check_reports_syntax_errors_without_running() {
    let dir = tempdir().expect("create temp dir");
    let good = dir.path().join("good.lm");
    fs::write(&good, "print(\"never printed\")\n").expect("write script");
    lumen()
        .arg("check")
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"))
        .stdout(predicate::str::contains("never printed").not());

    let bad = dir.path().join("bad.lm");
    fs::write(&bad, "func (x) { }\n").expect("write script");
    lumen()
        .arg("check")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E0001]"));
}

#[test]
fn missing_script_is_reported() {
    lumen()
        .arg("run")
        .arg("does/not/exist.lm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E0601"));
}

#[test]
fn warnings_go_to_stderr() {
    lumen()
        .arg("eval")
        .arg("let i = 1\nfor i in [2] { }")
        .assert()
        .success()
        .stderr(predicate::str::contains("warning[W0001]"));
}
