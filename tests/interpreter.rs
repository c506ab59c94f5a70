use lumen::{
    ErrorCode, Interpreter, InterpreterConfig, LumenError,
    value::{Value, ValueKind},
};
use std::path::Path;
use tempfile::tempdir;

fn capturing() -> Interpreter {
    Interpreter::with_config(InterpreterConfig::default().capturing_output())
}

fn eval(source: &str) -> Value {
    let mut interpreter = capturing();
    interpreter
        .eval_source(source)
        .expect("evaluation should succeed")
}

fn eval_error(source: &str) -> LumenError {
    let mut interpreter = capturing();
    match interpreter.eval_source(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(err) => err,
    }
}

fn output_of(source: &str) -> String {
    let mut interpreter = capturing();
    interpreter
        .eval_source(source)
        .expect("evaluation should succeed");
    interpreter.take_output()
}

fn expect_int(value: &Value) -> i64 {
    match value.0.as_ref() {
        ValueKind::Int(n) => *n,
        _ => panic!("expected Int, found {}", value.type_name()),
    }
}

fn expect_float(value: &Value) -> f64 {
    match value.0.as_ref() {
        ValueKind::Float(f) => *f,
        _ => panic!("expected Float, found {}", value.type_name()),
    }
}

fn expect_bool(value: &Value) -> bool {
    match value.0.as_ref() {
        ValueKind::Bool(b) => *b,
        _ => panic!("expected Bool, found {}", value.type_name()),
    }
}

fn expect_ints(value: &Value) -> Vec<i64> {
    value
        .list_items()
        .unwrap_or_else(|| panic!("expected List, found {}", value.type_name()))
        .iter()
        .map(expect_int)
        .collect()
}

fn error_code(err: &LumenError) -> ErrorCode {
    err.code().expect("error should carry a diagnostic")
}

#[test]
fn calls_user_function() {
    let value = eval(
        r#"
        func add(a, b) { return a + b }
        add(2, 3)
        "#,
    );
    assert_eq!(expect_int(&value), 5);
}

#[test]
fn function_without_return_yields_last_value() {
    let value = eval(
        r#"
        func double(x) { x * 2 }
        double(21)
        "#,
    );
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn recursion_uses_fresh_frames() {
    let value = eval(
        r#"
        func fib(n) {
            if n < 2 { return n }
            return fib(n - 1) + fib(n - 2)
        }
        fib(15)
        "#,
    );
    assert_eq!(expect_int(&value), 610);
}

#[test]
fn arithmetic_follows_precedence() {
    assert_eq!(expect_int(&eval("2 + 3 * 4 - (6 - 1)")), 9);
    assert_eq!(expect_int(&eval("17 % 5")), 2);
    assert_eq!(expect_int(&eval("-(4 - 10)")), 6);
}

#[test]
fn exact_integer_division_stays_int() {
    assert_eq!(expect_int(&eval("12 / 4")), 3);
    assert_eq!(expect_float(&eval("7 / 2")), 3.5);
    assert_eq!(expect_float(&eval("1.5 + 1")), 2.5);
}

#[test]
fn division_by_zero_reports_expression_span() {
    let err = eval_error("10 / 0");
    let diagnostic = err.diagnostic().expect("diagnostic");
    assert_eq!(diagnostic.code, ErrorCode::E0301);
    let location = diagnostic.location.as_ref().expect("location");
    assert_eq!((location.line, location.column), (1, 1));
}

#[test]
fn integer_overflow_is_reported() {
    let err = eval_error("9223372036854775807 + 1");
    assert_eq!(error_code(&err), ErrorCode::E0304);
}

#[test]
fn logical_operators_short_circuit() {
    let value = eval(
        r#"
        let calls = []
        func touch() { append(calls, 1); return true }
        let a = false and touch()
        let b = true or touch()
        let c = true && touch()
        len(calls)
        "#,
    );
    assert_eq!(expect_int(&value), 1);
}

#[test]
fn comparison_and_equality() {
    assert!(expect_bool(&eval("1 < 2 and 2 <= 2 and 3 > 2 and 3 >= 3")));
    assert!(expect_bool(&eval("1 == 1.0")));
    assert!(expect_bool(&eval("\"abc\" < \"abd\"")));
    assert!(expect_bool(&eval("[1, 2] == [1, 2]")));
    assert!(expect_bool(&eval("not (1 != 1)")));
}

#[test]
fn mixing_incompatible_operands_is_a_type_error() {
    let err = eval_error("1 + \"one\"");
    assert_eq!(error_code(&err), ErrorCode::E0203);
    assert!(err.to_string().contains("Int and String"));
}

#[test]
fn string_concatenation_and_repetition() {
    let value = eval("\"ab\" + \"cd\" * 2");
    assert_eq!(value.as_str(), Some("abcdcd"));
}

#[test]
fn both_conditional_styles_choose_branches() {
    let value = eval(
        r#"
        let x = 7
        let label = "none"
        if x > 10 { label = "big" } else if x > 5 { label = "medium" } else { label = "small" }
        let mood = ""
        when label == "medium" { mood = "fine" } otherwise { mood = "odd" }
        label + "/" + mood
        "#,
    );
    assert_eq!(value.as_str(), Some("medium/fine"));
}

#[test]
fn while_loop_with_break_and_continue() {
    let value = eval(
        r#"
        let i = 0
        let total = 0
        while true {
            i = i + 1
            if i > 10 { break }
            if i % 2 == 0 { continue }
            total = total + i
        }
        total
        "#,
    );
    assert_eq!(expect_int(&value), 25);
}

#[test]
fn for_range_is_inclusive_and_honours_step() {
    let value = eval(
        r#"
        let seen = []
        for i from 1 to 5 { append(seen, i) }
        for j from 10 to 0 step -5 { append(seen, j) }
        seen
        "#,
    );
    assert_eq!(expect_ints(&value), vec![1, 2, 3, 4, 5, 10, 5, 0]);
}

#[test]
fn range_step_of_zero_is_rejected() {
    let err = eval_error("for i from 1 to 3 step 0 { }");
    assert_eq!(error_code(&err), ErrorCode::E0503);
}

#[test]
fn for_each_walks_lists_and_binds_other_values_once() {
    let value = eval(
        r#"
        let total = 0
        for n in [1, 2, 3] { total = total + n }
        let rounds = 0
        let size = 0
        for entry in {"a": 1, "b": 2} {
            rounds = rounds + 1
            size = len(entry)
        }
        for word in "hey" { rounds = rounds + len(word) }
        str(total) + ":" + str(rounds) + ":" + str(size)
        "#,
    );
    assert_eq!(value.as_str(), Some("6:4:2"));
}

#[test]
fn repeat_runs_fixed_count() {
    let value = eval(
        r#"
        let n = 0
        repeat 4 times { n = n + 2 }
        repeat -3 times { n = 100 }
        n
        "#,
    );
    assert_eq!(expect_int(&value), 8);
}

#[test]
fn return_inside_loop_leaves_function() {
    let value = eval(
        r#"
        func first_even(items) {
            for item in items {
                if item % 2 == 0 { return item }
            }
            return -1
        }
        first_even([3, 5, 8, 10])
        "#,
    );
    assert_eq!(expect_int(&value), 8);
}

#[test]
fn break_outside_loop_is_rejected() {
    let err = eval_error("break");
    assert_eq!(error_code(&err), ErrorCode::E0305);
}

#[test]
fn list_and_dict_indexing() {
    let value = eval(
        r#"
        let items = [10, 20, 30]
        items[1] = items[1] + 5
        let scores = {"ann": 3}
        scores["bob"] = 4
        items[-1] + items[1] + scores["ann"] + scores.bob
        "#,
    );
    assert_eq!(expect_int(&value), 62);
}

#[test]
fn out_of_range_index_and_missing_key() {
    assert_eq!(error_code(&eval_error("[1, 2][5]")), ErrorCode::E0302);
    assert_eq!(error_code(&eval_error("({\"a\": 1})[\"b\"]")), ErrorCode::E0303);
}

#[test]
fn builtins_cover_conversions() {
    assert_eq!(expect_int(&eval("int(\"42\") + int(3.9)")), 45);
    assert_eq!(expect_float(&eval("float(\"2.5\")")), 2.5);
    assert_eq!(eval("str(3.0)").as_str(), Some("3.0"));
    assert_eq!(eval("type([])").as_str(), Some("List"));
    assert_eq!(expect_ints(&eval("range(2, 5)")), vec![2, 3, 4]);
    assert_eq!(expect_int(&eval("len(\"héllo\")")), 5);
}

#[test]
fn failed_conversion_is_a_runtime_error() {
    assert_eq!(error_code(&eval_error("int(\"forty\")")), ErrorCode::E0502);
}

#[test]
fn imported_modules_expose_functions() {
    let value = eval(
        r#"
        import math
        import string as s
        import collections
        let words = s.split("a,b,c", ",")
        let nums = [3, 1, 2]
        collections.push(nums, 4)
        math.max(1, 9, 4) + len(words) + collections.sum(nums) + math.floor(2.7)
        "#,
    );
    assert_eq!(expect_int(&value), 24);
}

#[test]
fn math_constants_and_functions() {
    let value = eval(
        r#"
        import math
        math.sqrt(16.0) + math.abs(-2) + math.pow(2, 3)
        "#,
    );
    assert_eq!(expect_float(&value), 14.0);
    assert!(expect_bool(&eval("import math\nmath.pi > 3.14")));
}

#[test]
fn unknown_module_suggests_closest_name() {
    let err = eval_error("import maths");
    let diagnostic = err.diagnostic().expect("diagnostic");
    assert_eq!(diagnostic.code, ErrorCode::E0101);
    assert_eq!(diagnostic.suggestion.as_deref(), Some("did you mean `math`?"));
}

#[test]
fn value_methods_on_builtin_types() {
    let value = eval(
        r#"
        let items = [1, 2]
        items.append(3)
        let d = {"x": 1, "y": 2}
        items.len() + d.keys().len() + "  hi ".trim().len() + d.get("y")
        "#,
    );
    assert_eq!(expect_int(&value), 9);
}

#[test]
fn print_writes_space_separated_line() {
    let output = output_of(
        r#"
        print("total:", 3, [1, "a"], none)
        print()
        "#,
    );
    assert_eq!(output, "total: 3 [1, \"a\"] none\n\n");
}

#[test]
fn state_persists_between_evaluations() {
    let mut interpreter = capturing();
    interpreter
        .eval_source("let counter = 1\nfunc bump() { counter = counter + 1 }")
        .expect("definitions");
    interpreter.eval_source("bump()").expect("first call");
    let value = interpreter.eval_source("bump()\ncounter").expect("second call");
    assert_eq!(expect_int(&value), 3);
}

#[test]
fn step_limit_stops_runaway_loops() {
    let mut interpreter = Interpreter::with_config(
        InterpreterConfig::default()
            .capturing_output()
            .with_max_steps(Some(50)),
    );
    let err = interpreter
        .eval_source("while true { }")
        .expect_err("loop should be cut off");
    assert_eq!(error_code(&err), ErrorCode::E0307);
}

#[test]
fn call_depth_limit_stops_unbounded_recursion() {
    let mut interpreter = Interpreter::with_config(
        InterpreterConfig::default()
            .capturing_output()
            .with_max_call_depth(16),
    );
    let err = interpreter
        .eval_source("func down(n) { return down(n + 1) }\ndown(0)")
        .expect_err("recursion should be cut off");
    assert_eq!(error_code(&err), ErrorCode::E0306);
    assert_eq!(interpreter.scope_depth(), 1);
}

#[test]
fn recursion_up_to_the_depth_limit_fits_a_small_thread_stack() {
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let mut interpreter = capturing();
            interpreter
                .eval_source("func f(n) { if n == 0 { return 0 } return f(n - 1) + 1 }")
                .expect("definition");
            let deepest = interpreter.eval_source("f(199)").map(|value| expect_int(&value));
            let too_deep = interpreter.eval_source("f(400)").map(|value| expect_int(&value));
            (
                deepest.map_err(|err| err.code()),
                too_deep.map_err(|err| err.code()),
                interpreter.scope_depth(),
            )
        })
        .expect("spawn interpreter thread");
    let (deepest, too_deep, depth) = worker.join().expect("interpreter thread panicked");
    assert_eq!(deepest, Ok(199));
    assert_eq!(too_deep, Err(Some(ErrorCode::E0306)));
    assert_eq!(depth, 1);
}

#[test]
fn deeply_nested_parentheses_are_a_syntax_error() {
    let shallow = format!("{}1{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(expect_int(&eval(&shallow)), 1);

    let deep = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
    let err = eval_error(&deep);
    assert_eq!(error_code(&err), ErrorCode::E0001);
    assert!(err.to_string().contains("nesting exceeds"));
}

#[test]
fn oversized_sequences_are_rejected() {
    let err = eval_error(r#""ab" * 9223372036854775807"#);
    assert_eq!(error_code(&err), ErrorCode::E0502);

    let err = eval_error("range(0, 9223372036854775807)");
    assert_eq!(error_code(&err), ErrorCode::E0502);

    let value = eval(r#"len("ab" * 1000) + len(range(-5, 5))"#);
    assert_eq!(expect_int(&value), 2010);
}

#[test]
fn self_containing_containers_print_and_compare() {
    let output = output_of(
        r#"
        let xs = [1]
        append(xs, xs)
        print(xs)
        let d = {"a": 1}
        d["self"] = d
        print(d)
        print(xs == xs)
        let ys = [1]
        append(ys, ys)
        print(xs == ys)
        "#,
    );
    assert_eq!(output, "[1, [...]]\n{\"a\": 1, \"self\": {...}}\ntrue\ntrue\n");
}

#[test]
fn run_file_reports_script_name() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("broken.lm");
    std::fs::write(&script, "let x = 1\nx + missing\n").expect("write script");

    let mut interpreter = capturing();
    let err = interpreter.run_file(&script).expect_err("script should fail");
    let diagnostic = err.diagnostic().expect("diagnostic");
    assert_eq!(diagnostic.code, ErrorCode::E0401);
    let location = diagnostic.location.as_ref().expect("location");
    assert_eq!(location.file, script.display().to_string());
    assert_eq!((location.line, location.column), (2, 5));
}

#[test]
fn missing_script_is_an_io_diagnostic() {
    let mut interpreter = capturing();
    let err = interpreter
        .run_file(Path::new("/definitely/not/here.lm"))
        .expect_err("missing file");
    assert_eq!(error_code(&err), ErrorCode::E0601);
}

#[test]
fn demo_scripts_run_cleanly() {
    let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
    for name in ["quickstart.lm", "shapes.lm", "errors.lm"] {
        let mut interpreter = capturing();
        interpreter
            .run_file(&demos.join(name))
            .unwrap_or_else(|err| panic!("{name} failed: {err}"));
        assert!(!interpreter.take_output().is_empty(), "{name} printed nothing");
    }
}
