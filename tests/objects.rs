use lumen::{ErrorCode, Interpreter, InterpreterConfig, LumenError, Value};

fn interpreter() -> Interpreter {
    Interpreter::with_config(InterpreterConfig::default().capturing_output())
}

fn eval(source: &str) -> Value {
    interpreter()
        .eval_source(source)
        .expect("evaluation should succeed")
}

fn eval_error(source: &str) -> LumenError {
    match interpreter().eval_source(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(err) => err,
    }
}

const ANIMALS: &str = r#"
class Animal {
    let sound = "..."
    func __init__(self, name) { self.name = name }
    func speak(self) { return self.name + " says " + self.sound }
    func kind(self) { return "animal" }
}

class Dog(Animal) {
    let sound = "woof"
    let tricks = 0
    func __init__(self, name) {
        super().__init__(name)
        self.tricks = 1
    }
    func kind(self) { return "dog, a kind of " + super().kind() }
    static describe(n) { return "dogs have " + str(n) + " legs" }
    classmethod named(cls, name) { return cls(name) }
}
"#;

fn with_animals(tail: &str) -> Value {
    eval(&format!("{ANIMALS}\n{tail}"))
}

#[test]
fn subclass_without_fields_gets_no_ancestor_defaults() {
    let err = eval_error("class A { let x = 1 }\nclass B(A) { }\nB().x");
    assert_eq!(err.code(), Some(ErrorCode::E0403));

    let value = eval("class A { let x = 1 }\nclass B(A) { }\nB.x");
    assert_eq!(value.as_int(), Some(1));
}

#[test]
fn methods_see_instance_fields_and_defaults() {
    let value = with_animals("Dog(\"rex\").speak()");
    assert_eq!(value.as_str(), Some("rex says woof"));
}

#[test]
fn super_reaches_base_initialiser_and_methods() {
    let value = with_animals(
        r#"
        let d = Dog("fido")
        d.kind() + " / " + d.name + " / " + str(d.tricks)
        "#,
    );
    assert_eq!(value.as_str(), Some("dog, a kind of animal / fido / 1"));
}

#[test]
fn static_and_class_methods() {
    let value = with_animals(
        r#"
        let pup = Dog.named("pip")
        Dog.describe(4) + "; " + pup.speak() + "; " + type(pup)
        "#,
    );
    assert_eq!(value.as_str(), Some("dogs have 4 legs; pip says woof; Dog"));
}

#[test]
fn isinstance_follows_inheritance() {
    let value = with_animals(
        r#"
        let d = Dog("rex")
        let a = Animal("cat")
        [isinstance(d, Animal), isinstance(d, Dog), isinstance(a, Dog), isinstance(3, Animal)]
        "#,
    );
    assert_eq!(value.to_string(), "[true, true, false, false]");
}

#[test]
fn diamond_hierarchy_uses_first_occurrence_order() {
    let mut interpreter = interpreter();
    let value = interpreter
        .eval_source(
            r#"
            class A { func who(self) { return "A" } }
            class B(A) { }
            class C(A) { func who(self) { return "C" } }
            class D(B, C) { }
            D().who()
            "#,
        )
        .expect("diamond should evaluate");
    assert_eq!(
        interpreter.class_mro("D"),
        Some(vec!["D".to_string(), "B".into(), "A".into(), "C".into()])
    );
    assert_eq!(value.as_str(), Some("A"));
}

#[test]
fn properties_route_reads_and_writes() {
    let value = eval(
        r#"
        class Temperature {
            func __init__(self, celsius) { self._c = celsius }
            property fahrenheit {
                get(self) { return self._c * 9 / 5 + 32 }
                set(self, f) { self._c = (f - 32) * 5 / 9 }
            }
            property celsius {
                get(self) { return self._c }
            }
        }
        let t = Temperature(100)
        let before = t.fahrenheit
        t.fahrenheit = 32
        [before, t.celsius]
        "#,
    );
    assert_eq!(value.to_string(), "[212, 0]");
}

#[test]
fn read_only_property_rejects_assignment() {
    let err = eval_error(
        r#"
        class Box {
            property size { get(self) { return 1 } }
        }
        let b = Box()
        b.size = 3
        "#,
    );
    let diagnostic = err.diagnostic().expect("diagnostic");
    assert_eq!(diagnostic.code, ErrorCode::E0403);
    assert_eq!(diagnostic.message, "property `size` of `Box` is read-only");
}

#[test]
fn missing_attribute_suggests_member() {
    let err = eval_error(&format!("{ANIMALS}\nDog(\"rex\").speek()"));
    let diagnostic = err.diagnostic().expect("diagnostic");
    assert_eq!(diagnostic.code, ErrorCode::E0403);
    assert_eq!(diagnostic.message, "`Dog` object has no attribute `speek`");
    assert_eq!(diagnostic.suggestion.as_deref(), Some("did you mean `speak`?"));
}

#[test]
fn constructor_arity_is_checked() {
    let err = eval_error(&format!("{ANIMALS}\nDog()"));
    let diagnostic = err.diagnostic().expect("diagnostic");
    assert_eq!(diagnostic.code, ErrorCode::E0501);
    assert_eq!(
        diagnostic.message,
        "wrong number of arguments to `Dog`: expected 1, got 0"
    );
}

#[test]
fn bound_method_arity_excludes_receiver() {
    let err = eval_error(&format!("{ANIMALS}\nDog(\"rex\").speak(1)"));
    assert_eq!(err.code(), Some(ErrorCode::E0501));
    assert!(err.to_string().contains("expected 0, got 1"));
}

#[test]
fn unknown_base_class_is_reported() {
    let err = eval_error("class Puppy(Dgo) { }");
    let diagnostic = err.diagnostic().expect("diagnostic");
    assert_eq!(diagnostic.code, ErrorCode::E0404);
    assert_eq!(diagnostic.message, "undefined class `Dgo`");
    let location = diagnostic.location.as_ref().expect("location");
    assert_eq!(location.column, 13);
}

#[test]
fn super_outside_method_is_rejected() {
    assert_eq!(eval_error("super().x").code(), Some(ErrorCode::E0404));
    let err = eval_error(
        r#"
        class S { static f() { return super().f() } }
        S.f()
        "#,
    );
    assert_eq!(err.code(), Some(ErrorCode::E0404));
}

#[test]
fn redefining_a_class_warns() {
    let mut interpreter = interpreter();
    interpreter
        .eval_source("class P { }\nclass P { func hi(self) { return 1 } }\nP().hi()")
        .expect("redefinition is allowed");
    let codes: Vec<ErrorCode> = interpreter.warnings().iter().map(|w| w.code).collect();
    assert_eq!(codes, vec![ErrorCode::W0002]);
}

#[test]
fn objects_compare_by_identity() {
    let value = eval(
        r#"
        class Point { func __init__(self, x) { self.x = x } }
        let p = Point(1)
        let q = Point(1)
        let r = p
        [p == q, p == r]
        "#,
    );
    assert_eq!(value.to_string(), "[false, true]");
}
