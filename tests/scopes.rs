use std::rc::Rc;

use lumen::{
    ErrorCode, Interpreter, InterpreterConfig, SourceSpan, SourceText, Value,
    ast::Stmt,
    environment::{FunctionTable, Scopes},
};

fn interpreter() -> Interpreter {
    Interpreter::with_config(InterpreterConfig::default().capturing_output())
}

fn eval_in(interpreter: &mut Interpreter, source: &str) -> Value {
    interpreter
        .eval_source(source)
        .expect("evaluation should succeed")
}

#[test]
fn parameters_do_not_leak_into_caller() {
    let mut interpreter = interpreter();
    let value = eval_in(
        &mut interpreter,
        r#"
        let x = "outer"
        func show(x) { return x }
        let first = show(1)
        let second = show(2)
        [first, second, x]
        "#,
    );
    assert_eq!(value.to_string(), "[1, 2, \"outer\"]");
    assert_eq!(interpreter.scope_depth(), 1);
}

#[test]
fn function_locals_vanish_after_return() {
    let mut interpreter = interpreter();
    eval_in(&mut interpreter, "func f() { let inner = 1 }\nf()");
    let err = interpreter.eval_source("inner").expect_err("inner is local");
    assert_eq!(err.code(), Some(ErrorCode::E0401));
}

#[test]
fn assignment_rebinds_enclosing_binding() {
    let value = eval_in(
        &mut interpreter(),
        r#"
        let hits = 0
        func hit() { hits = hits + 1 }
        hit()
        hit()
        hits
        "#,
    );
    assert_eq!(value.as_int(), Some(2));
}

#[test]
fn callee_resolves_names_against_live_stack() {
    let value = eval_in(
        &mut interpreter(),
        r#"
        func reader() { return secret }
        func caller() {
            let secret = 41
            return reader() + 1
        }
        caller()
        "#,
    );
    assert_eq!(value.as_int(), Some(42));
}

#[test]
fn frames_are_popped_when_a_call_fails() {
    let mut interpreter = interpreter();
    let err = interpreter
        .eval_source("func boom(n) { let local = n\nreturn n / 0 }\nboom(5)")
        .expect_err("division by zero");
    assert_eq!(err.code(), Some(ErrorCode::E0301));
    assert_eq!(interpreter.scope_depth(), 1);
    assert!(interpreter.global("local").is_none());
    assert!(interpreter.global("n").is_none());
}

#[test]
fn loop_variable_restores_prior_value() {
    let mut interpreter = interpreter();
    let value = eval_in(
        &mut interpreter,
        r#"
        let item = "kept"
        let total = 0
        for item in [1, 2, 3] { total = total + item }
        item + ":" + str(total)
        "#,
    );
    assert_eq!(value.as_str(), Some("kept:6"));
    let codes: Vec<ErrorCode> = interpreter.warnings().iter().map(|w| w.code).collect();
    assert_eq!(codes, vec![ErrorCode::W0001]);
}

#[test]
fn loop_variable_is_removed_when_new() {
    let mut interpreter = interpreter();
    eval_in(&mut interpreter, "for k from 1 to 3 { }");
    assert!(interpreter.global("k").is_none());
    assert!(interpreter.warnings().is_empty());
}

#[test]
fn loop_variable_is_restored_after_error() {
    let mut interpreter = interpreter();
    eval_in(&mut interpreter, "let i = 100");
    interpreter
        .eval_source("for i in [1, 0] { 10 / i }")
        .expect_err("second iteration divides by zero");
    assert_eq!(interpreter.global("i").and_then(|v| v.as_int()), Some(100));
}

#[test]
fn loop_variable_is_restored_after_early_return() {
    let value = eval_in(
        &mut interpreter(),
        r#"
        func find(items) {
            let n = "before"
            for n in items {
                if n == 2 { return n }
            }
            return n
        }
        let hit = find([1, 2, 3])
        let miss = find([7])
        [hit, miss]
        "#,
    );
    assert_eq!(value.to_string(), "[2, \"before\"]");
}

#[test]
fn non_list_iterable_runs_once() {
    let value = eval_in(
        &mut interpreter(),
        r#"
        let seen = []
        for v in 5 { append(seen, v) }
        seen
        "#,
    );
    assert_eq!(value.to_string(), "[5]");
}

#[test]
fn scopes_search_innermost_first() {
    let mut scopes = Scopes::new();
    scopes.define("x", Value::int(1));
    scopes.push_scope();
    assert_eq!(scopes.lookup("x").and_then(|v| v.as_int()), Some(1));

    scopes.define("x", Value::int(2));
    assert_eq!(scopes.lookup("x").and_then(|v| v.as_int()), Some(2));
    assert_eq!(scopes.visible_names(), vec!["x"]);

    scopes.pop_scope();
    assert_eq!(scopes.lookup("x").and_then(|v| v.as_int()), Some(1));
    assert_eq!(scopes.depth(), 1);
}

#[test]
fn global_frame_is_never_popped() {
    let mut scopes = Scopes::new();
    scopes.define("g", Value::bool(true));
    scopes.pop_scope();
    assert_eq!(scopes.depth(), 1);
    assert!(scopes.lookup("g").is_some());
}

#[test]
fn assign_prefers_existing_binding() {
    let mut scopes = Scopes::new();
    scopes.define("count", Value::int(0));
    scopes.push_scope();
    scopes.assign("count", Value::int(5));
    scopes.assign("fresh", Value::int(1));
    assert!(scopes.local("count").is_none());
    assert!(scopes.local("fresh").is_some());
    scopes.pop_scope();
    assert_eq!(scopes.globals().get("count").and_then(|v| v.as_int()), Some(5));
    assert!(scopes.lookup("fresh").is_none());
}

#[test]
fn function_table_replaces_definitions() {
    let mut table = FunctionTable::new();
    assert!(table.is_empty());
    let body: Rc<[Stmt]> = Rc::from(Vec::new());
    let source = Rc::new(SourceText::new("<input>", "func f(a, b) { }"));
    table.define_function("f", vec!["a".into()], Rc::clone(&body), SourceSpan::default(), Rc::clone(&source));
    table.define_function("f", vec!["a".into(), "b".into()], body, SourceSpan::default(), source);
    assert_eq!(table.len(), 1);
    let def = table.lookup_function("f").expect("defined");
    assert_eq!(def.params, vec!["a".to_string(), "b".to_string()]);
    assert!(def.owner.is_none());
    assert!(table.lookup_function("g").is_none());
}
