use lumen::{
    Diagnostic, ErrorCode, Interpreter, InterpreterConfig, LastError, LumenError, Outcome,
    OutcomeError, Severity,
};
use lumen::suggest::edit_distance;
use pretty_assertions::assert_eq;

fn interpreter() -> Interpreter {
    Interpreter::with_config(InterpreterConfig::default().capturing_output())
}

fn diagnostic_for(source: &str) -> Diagnostic {
    match interpreter().eval_source(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(LumenError::Diagnostic(diagnostic)) => diagnostic,
        Err(other) => panic!("expected diagnostic, received {other}"),
    }
}

#[test]
fn undefined_variable_points_at_reference() {
    let diagnostic = diagnostic_for("print(x)");
    assert_eq!(
        diagnostic.format(),
        "error[E0401]: undefined variable `x`\n \
         --> <input>:1:7\n  \
         |\n\
         1 | print(x)\n  \
         |       ^\n"
    );
}

#[test]
fn arity_mismatch_underlines_whole_call() {
    let diagnostic = diagnostic_for("func add(a, b) { return a + b }\nadd(1)");
    assert_eq!(diagnostic.code, ErrorCode::E0501);
    assert_eq!(
        diagnostic.format(),
        "error[E0501]: wrong number of arguments to `add`: expected 2, got 1\n \
         --> <input>:2:1\n  \
         |\n\
         2 | add(1)\n  \
         | ^^^^^^\n"
    );
}

#[test]
fn arity_mismatch_reports_extra_arguments() {
    let diagnostic = diagnostic_for("func add(a, b) { return a + b }\nadd(1, 2, 3)");
    assert_eq!(diagnostic.code, ErrorCode::E0501);
    assert_eq!(
        diagnostic.format(),
        "error[E0501]: wrong number of arguments to `add`: expected 2, got 3\n \
         --> <input>:2:1\n  \
         |\n\
         2 | add(1, 2, 3)\n  \
         | ^^^^^^^^^^^^\n"
    );
}

#[test]
fn edit_distance_counts_single_character_edits() {
    assert_eq!(edit_distance("kitten", "sitting"), 3);
    assert_eq!(edit_distance("count", "cont"), 1);
    assert_eq!(edit_distance("flaw", "lawn"), 2);
    assert_eq!(edit_distance("", "abc"), 3);
    assert_eq!(edit_distance("greet", "greet"), 0);
}

#[test]
fn arguments_are_not_evaluated_on_arity_mismatch() {
    let mut interpreter = interpreter();
    let err = interpreter
        .eval_source("func one(a) { a }\none(print(\"side effect\"), 2)")
        .expect_err("arity mismatch");
    assert_eq!(err.code(), Some(ErrorCode::E0501));
    assert_eq!(interpreter.take_output(), "");
}

#[test]
fn suggestions_are_rendered_as_help() {
    let diagnostic = diagnostic_for("let total = 3\ntotl + 1");
    assert_eq!(diagnostic.suggestion.as_deref(), Some("did you mean `total`?"));
    assert!(diagnostic.format().ends_with("help: did you mean `total`?\n"));
}

#[test]
fn undefined_function_is_its_own_code() {
    let diagnostic = diagnostic_for("func greet() { 1 }\ngreat()");
    assert_eq!(diagnostic.code, ErrorCode::E0402);
    assert_eq!(diagnostic.suggestion.as_deref(), Some("did you mean `greet`?"));
}

#[test]
fn calling_a_non_function_is_a_type_error() {
    let diagnostic = diagnostic_for("let n = 4\nn(1)");
    assert_eq!(diagnostic.code, ErrorCode::E0202);
    assert_eq!(diagnostic.message, "`n` is not callable");
}

#[test]
fn syntax_errors_carry_codes() {
    let unexpected = diagnostic_for("let = 5");
    assert_eq!(unexpected.code, ErrorCode::E0001);
    assert_eq!(unexpected.message, "expected variable name, found `=`");
    let location = unexpected.location.as_ref().expect("location");
    assert_eq!((location.line, location.column), (1, 5));

    assert_eq!(diagnostic_for("let s = \"open").code, ErrorCode::E0002);
    assert_eq!(diagnostic_for("func f(").code, ErrorCode::E0004);
    assert_eq!(diagnostic_for("func f(a, a) { }").code, ErrorCode::E0001);
}

#[test]
fn invalid_assignment_target_has_related_note() {
    let diagnostic = diagnostic_for("1 = 2");
    assert_eq!(diagnostic.code, ErrorCode::E0005);
    assert_eq!(diagnostic.related.len(), 1);
    assert!(
        diagnostic
            .format()
            .contains("note: assignment starts here at <input>:1:3")
    );
}

#[test]
fn parse_failure_runs_nothing() {
    let mut interpreter = interpreter();
    let err = interpreter
        .eval_source("print(\"early\")\nlet = 1")
        .expect_err("syntax error");
    assert_eq!(err.code(), Some(ErrorCode::E0001));
    assert_eq!(interpreter.take_output(), "");
}

#[test]
fn json_rendering_is_structured() {
    let diagnostic = diagnostic_for("print(x)");
    let json: serde_json::Value =
        serde_json::from_str(&diagnostic.to_json()).expect("valid json");
    assert_eq!(json["code"], "E0401");
    assert_eq!(json["severity"], "error");
    assert_eq!(json["location"]["file"], "<input>");
    assert_eq!(json["location"]["line"], 1);
    assert_eq!(json["location"]["column"], 7);
    assert_eq!(json["source_line"], "print(x)");
}

#[test]
fn script_name_replaces_default_file() {
    let mut interpreter = Interpreter::with_config(
        InterpreterConfig::default()
            .capturing_output()
            .with_script_name("main.lm"),
    );
    let err = interpreter.eval_source("\n\nmissing").expect_err("undefined");
    let location = err
        .diagnostic()
        .and_then(|diagnostic| diagnostic.location.clone())
        .expect("location");
    assert_eq!(location.to_string(), "main.lm:3:1");
}

#[test]
fn warnings_have_warning_severity() {
    let mut interpreter = interpreter();
    interpreter
        .eval_source("let i = 0\nfor i in [1] { }")
        .expect("loop runs");
    let warning = &interpreter.warnings()[0];
    assert_eq!(warning.severity, Severity::Warning);
    assert!(warning.format().starts_with("warning[W0001]: loop variable `i`"));
}

#[test]
fn outcome_holds_exactly_one_side() {
    let ok = Outcome::from_parts(Some(3), None).expect("value only");
    assert_eq!(ok.value(), Some(&3));
    assert!(ok.error().is_none());

    let failure = Diagnostic::new(ErrorCode::E0301, "division by zero");
    let err: Outcome<i32> = Outcome::from_parts(None, Some(failure.clone())).expect("error only");
    assert!(err.is_err());
    assert_eq!(err.into_result(), Err(failure.clone()));

    assert_eq!(
        Outcome::from_parts(Some(1), Some(failure)),
        Err(OutcomeError::Both)
    );
    assert_eq!(Outcome::<i32>::from_parts(None, None), Err(OutcomeError::Neither));
}

#[test]
fn last_error_slot_tracks_most_recent_operation() {
    let slot = LastError::new();
    let failed: Outcome<()> = slot.err(ErrorCode::E0302, "index 9 out of range");
    assert!(failed.is_err());
    assert_eq!(slot.get().map(|d| d.code), Some(ErrorCode::E0302));

    let ok = slot.ok(5);
    assert_eq!(ok, Outcome::Ok(5));
    assert!(slot.get().is_none());
}

#[test]
fn missing_dict_key_leaves_error_behind() {
    let value = interpreter()
        .eval_source(
            r#"
            let found = get({"a": 1}, "b")
            let e = last_error()
            [found, e.code]
            "#,
        )
        .expect("get never fails");
    assert_eq!(value.to_string(), "[none, \"E0303\"]");
}

#[test]
fn successful_builtin_clears_last_error() {
    let value = interpreter()
        .eval_source(
            r#"
            get({}, "missing")
            len([1, 2])
            last_error()
            "#,
        )
        .expect("evaluation succeeds");
    assert!(value.is_none());
}

#[test]
fn failures_are_visible_to_later_evaluations() {
    let mut interpreter = interpreter();
    interpreter
        .eval_source("int(\"nope\")")
        .expect_err("conversion fails");
    assert_eq!(
        interpreter.last_error().map(|d| d.code),
        Some(ErrorCode::E0502)
    );
    let value = interpreter
        .eval_source("last_error().message")
        .expect("slot readable");
    assert_eq!(value.as_str(), Some("cannot convert \"nope\" to Int"));
}

#[test]
fn error_values_expose_code_and_message() {
    let value = interpreter()
        .eval_source("let e = error(\"E0301\", \"boom\")\ne.code + \": \" + e.message")
        .expect("error value");
    assert_eq!(value.as_str(), Some("E0301: boom"));
    assert_eq!(
        diagnostic_for("error(\"X9999\", \"bad\")").code,
        ErrorCode::E0502
    );
}

#[test]
fn error_codes_round_trip_through_text() {
    for code in [ErrorCode::E0001, ErrorCode::E0401, ErrorCode::W0002] {
        assert_eq!(ErrorCode::from_str_code(code.as_str()), Some(code));
    }
    assert_eq!(ErrorCode::from_str_code("E9999"), None);
}
