use lumen::{InterpreterConfig, Repl};

fn session() -> Repl {
    Repl::with_config(
        InterpreterConfig::default()
            .with_script_name("<repl>")
            .capturing_output(),
    )
}

#[test]
fn definitions_survive_between_lines() {
    let mut repl = session();
    assert_eq!(repl.eval_line("let x = 2"), None);
    assert_eq!(repl.eval_line("func twice(n) { n * 2 }"), None);
    assert_eq!(repl.eval_line("twice(x) + 1").as_deref(), Some("5\n"));
    assert_eq!(repl.eval_line("\"hi\"").as_deref(), Some("\"hi\"\n"));
}

#[test]
fn errors_are_rendered_and_the_session_continues() {
    let mut repl = session();
    let rendered = repl.eval_line("y + 1").expect("diagnostic output");
    assert!(rendered.starts_with("error[E0401]: undefined variable `y`\n"));
    assert!(rendered.contains("--> <repl>:1:1"));

    assert_eq!(repl.eval_line("last_error().code").as_deref(), Some("\"E0401\"\n"));
    assert_eq!(repl.eval_line("1 + 1").as_deref(), Some("2\n"));
}

#[test]
fn errors_inside_earlier_definitions_show_the_defining_line() {
    let mut repl = session();
    assert_eq!(repl.eval_line("func f() { return 10 / 0 }"), None);
    let rendered = repl.eval_line("f()").expect("diagnostic output");
    assert!(rendered.starts_with("error[E0301]: division by zero\n"));
    assert!(rendered.contains(" --> <repl>:1:19\n"));
    assert!(rendered.contains("1 | func f() { return 10 / 0 }\n"));
    assert!(rendered.contains("  |                   ^^^^^^\n"));
    assert!(!rendered.contains("1 | f()"));
}

#[test]
fn warnings_are_shown_once() {
    let mut repl = session();
    repl.eval_line("let i = 0");
    let rendered = repl.eval_line("for i in [1] { }").expect("warning output");
    assert!(rendered.starts_with("warning[W0001]"));
    assert_eq!(repl.eval_line("i").as_deref(), Some("0\n"));
}
