use indexmap::IndexMap;

use crate::{
    diagnostics::Diagnostic,
    error_code::ErrorCode,
    outcome::Outcome,
    runtime::{ExecutionContext, arity_error},
    value::{Callable, DictKey, MAX_SEQUENCE_LEN, NativeCallback, NativeFunction, Value, ValueKind},
};

/// Unwrap a `Result<_, Diagnostic>` inside a native, failing the outcome
/// (and recording it as the last error) on `Err`.
macro_rules! attempt {
    ($ctx:expr, $expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(diagnostic) => return $ctx.last_error.fail(diagnostic),
        }
    };
}

type Entry = (&'static str, Option<usize>, NativeCallback);

const BUILTINS: &[Entry] = &[
    ("print", None, builtin_print),
    ("len", Some(1), builtin_len),
    ("str", Some(1), builtin_str),
    ("int", Some(1), builtin_int),
    ("float", Some(1), builtin_float),
    ("type", Some(1), builtin_type),
    ("range", Some(2), builtin_range),
    ("append", Some(2), builtin_append),
    ("keys", Some(1), builtin_keys),
    ("get", Some(2), builtin_get),
    ("last_error", Some(0), builtin_last_error),
    ("isinstance", Some(2), builtin_isinstance),
    ("error", Some(2), builtin_error),
];

const MATH: &[Entry] = &[
    ("sqrt", Some(1), math_sqrt),
    ("floor", Some(1), math_floor),
    ("ceil", Some(1), math_ceil),
    ("abs", Some(1), math_abs),
    ("pow", Some(2), math_pow),
    ("min", None, math_min),
    ("max", None, math_max),
];

const STRING: &[Entry] = &[
    ("upper", Some(1), string_upper),
    ("lower", Some(1), string_lower),
    ("trim", Some(1), string_trim),
    ("split", Some(2), string_split),
    ("join", Some(2), string_join),
    ("replace", Some(3), string_replace),
    ("contains", Some(2), string_contains),
];

const COLLECTIONS: &[Entry] = &[
    ("push", Some(2), collections_push),
    ("pop", Some(1), collections_pop),
    ("reverse", Some(1), collections_reverse),
    ("sum", Some(1), collections_sum),
];

// Methods take the receiver as their first argument; arities include it.
const LIST_METHODS: &[Entry] = &[
    ("append", Some(2), builtin_append),
    ("pop", Some(1), collections_pop),
    ("len", Some(1), builtin_len),
];

const DICT_METHODS: &[Entry] = &[
    ("keys", Some(1), builtin_keys),
    ("values", Some(1), dict_values),
    ("get", Some(2), builtin_get),
    ("len", Some(1), builtin_len),
];

const STRING_METHODS: &[Entry] = &[
    ("upper", Some(1), string_upper),
    ("lower", Some(1), string_lower),
    ("split", Some(2), string_split),
    ("trim", Some(1), string_trim),
    ("len", Some(1), builtin_len),
];

/// Names accepted by `import`.
pub const MODULES: &[&str] = &["math", "string", "collections"];

fn native((name, arity, callback): Entry) -> NativeFunction {
    NativeFunction {
        name,
        arity,
        callback,
    }
}

fn table(entries: &[Entry]) -> IndexMap<String, Value> {
    entries
        .iter()
        .map(|entry| {
            (
                entry.0.to_string(),
                Value::function(Callable::Native(native(*entry))),
            )
        })
        .collect()
}

pub fn builtins() -> IndexMap<String, Value> {
    table(BUILTINS)
}

pub fn module(name: &str) -> Option<Value> {
    let mut exports = match name {
        "math" => table(MATH),
        "string" => table(STRING),
        "collections" => table(COLLECTIONS),
        _ => return None,
    };
    if name == "math" {
        exports.insert("pi".into(), Value::float(std::f64::consts::PI));
    }
    Some(Value::module(name, exports))
}

fn methods_for(target: &Value) -> &'static [Entry] {
    match target.kind() {
        ValueKind::List(_) => LIST_METHODS,
        ValueKind::Dict(_) => DICT_METHODS,
        ValueKind::String(_) => STRING_METHODS,
        _ => &[],
    }
}

/// Builtin method `name` on a list, dict or string.
pub fn value_method(target: &Value, name: &str) -> Option<NativeFunction> {
    methods_for(target)
        .iter()
        .find(|entry| entry.0 == name)
        .map(|entry| native(*entry))
}

pub fn value_method_names(target: &Value) -> Vec<String> {
    methods_for(target)
        .iter()
        .map(|entry| entry.0.to_string())
        .collect()
}

fn type_error(function: &str, expected: &str, found: &Value) -> Diagnostic {
    Diagnostic::new(
        ErrorCode::E0201,
        format!("`{function}` expected {expected}, found {}", found.type_name()),
    )
}

fn expect_str<'a>(value: &'a Value, function: &str) -> Result<&'a str, Diagnostic> {
    value.as_str().ok_or_else(|| type_error(function, "String", value))
}

fn expect_int(value: &Value, function: &str) -> Result<i64, Diagnostic> {
    value.as_int().ok_or_else(|| type_error(function, "Int", value))
}

fn expect_number(value: &Value, function: &str) -> Result<f64, Diagnostic> {
    value
        .as_number()
        .ok_or_else(|| type_error(function, "a number", value))
}

fn expect_list(value: &Value, function: &str) -> Result<Vec<Value>, Diagnostic> {
    value.list_items().ok_or_else(|| type_error(function, "List", value))
}

fn float_to_int(value: f64, function: &str) -> Result<i64, Diagnostic> {
    if value.is_finite() && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        Ok(value as i64)
    } else {
        Err(Diagnostic::new(
            ErrorCode::E0502,
            format!("`{function}` cannot represent {value} as Int"),
        ))
    }
}

fn builtin_print(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    match ctx.write_line(&line) {
        Ok(()) => ctx.last_error.ok(Value::none()),
        Err(err) => ctx
            .last_error
            .err(ErrorCode::E0602, format!("failed to write output: {err}")),
    }
}

fn builtin_len(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value] = args else {
        return ctx.last_error.fail(arity_error("len", 1, args.len()));
    };
    let len = match value.kind() {
        ValueKind::String(s) => s.chars().count(),
        ValueKind::List(items) => items.borrow().len(),
        ValueKind::Dict(map) => map.borrow().len(),
        _ => return ctx.last_error.fail(type_error("len", "String, List or Dict", value)),
    };
    ctx.last_error.ok(Value::int(i64::try_from(len).unwrap_or(i64::MAX)))
}

fn builtin_str(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value] = args else {
        return ctx.last_error.fail(arity_error("str", 1, args.len()));
    };
    ctx.last_error.ok(Value::string(value.to_string()))
}

fn builtin_int(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value] = args else {
        return ctx.last_error.fail(arity_error("int", 1, args.len()));
    };
    let converted = match value.kind() {
        ValueKind::Int(n) => *n,
        ValueKind::Float(f) => attempt!(ctx, float_to_int(f.trunc(), "int")),
        ValueKind::Bool(b) => i64::from(*b),
        ValueKind::String(s) => attempt!(
            ctx,
            s.trim().parse::<i64>().map_err(|_| Diagnostic::new(
                ErrorCode::E0502,
                format!("cannot convert {s:?} to Int"),
            ))
        ),
        _ => return ctx.last_error.fail(type_error("int", "a number or String", value)),
    };
    ctx.last_error.ok(Value::int(converted))
}

fn builtin_float(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value] = args else {
        return ctx.last_error.fail(arity_error("float", 1, args.len()));
    };
    let converted = match value.kind() {
        ValueKind::Int(n) => *n as f64,
        ValueKind::Float(f) => *f,
        ValueKind::String(s) => attempt!(
            ctx,
            s.trim().parse::<f64>().map_err(|_| Diagnostic::new(
                ErrorCode::E0502,
                format!("cannot convert {s:?} to Float"),
            ))
        ),
        _ => return ctx.last_error.fail(type_error("float", "a number or String", value)),
    };
    ctx.last_error.ok(Value::float(converted))
}

fn builtin_type(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value] = args else {
        return ctx.last_error.fail(arity_error("type", 1, args.len()));
    };
    ctx.last_error.ok(Value::string(value.type_name()))
}

fn builtin_range(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [start, end] = args else {
        return ctx.last_error.fail(arity_error("range", 2, args.len()));
    };
    let start = attempt!(ctx, expect_int(start, "range"));
    let end = attempt!(ctx, expect_int(end, "range"));
    let len = i128::from(end) - i128::from(start);
    if len > MAX_SEQUENCE_LEN as i128 {
        return ctx.last_error.fail(Diagnostic::new(
            ErrorCode::E0502,
            format!("range({start}, {end}) would hold more than {MAX_SEQUENCE_LEN} items"),
        ));
    }
    ctx.last_error.ok(Value::list((start..end).map(Value::int).collect()))
}

fn builtin_append(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [list, item] = args else {
        return ctx.last_error.fail(arity_error("append", 2, args.len()));
    };
    match list.kind() {
        ValueKind::List(items) => {
            items.borrow_mut().push(item.clone());
            ctx.last_error.ok(Value::none())
        }
        _ => ctx.last_error.fail(type_error("append", "List", list)),
    }
}

fn builtin_keys(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [dict] = args else {
        return ctx.last_error.fail(arity_error("keys", 1, args.len()));
    };
    match dict.kind() {
        ValueKind::Dict(map) => {
            let keys = map.borrow().keys().map(DictKey::to_value).collect();
            ctx.last_error.ok(Value::list(keys))
        }
        _ => ctx.last_error.fail(type_error("keys", "Dict", dict)),
    }
}

fn dict_values(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [dict] = args else {
        return ctx.last_error.fail(arity_error("values", 1, args.len()));
    };
    match dict.kind() {
        ValueKind::Dict(map) => {
            let values = map.borrow().values().cloned().collect();
            ctx.last_error.ok(Value::list(values))
        }
        _ => ctx.last_error.fail(type_error("values", "Dict", dict)),
    }
}

/// Missing keys yield none and leave E0303 in the last-error slot.
fn builtin_get(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [dict, key] = args else {
        return ctx.last_error.fail(arity_error("get", 2, args.len()));
    };
    let ValueKind::Dict(map) = dict.kind() else {
        return ctx.last_error.fail(type_error("get", "Dict", dict));
    };
    let Some(lookup) = DictKey::from_value(key) else {
        return ctx.last_error.fail(type_error("get", "an Int, String or Bool key", key));
    };
    let found = map.borrow().get(&lookup).cloned();
    match found {
        Some(value) => ctx.last_error.ok(value),
        None => {
            ctx.last_error.record(Diagnostic::new(
                ErrorCode::E0303,
                format!("key {lookup} not found"),
            ));
            Outcome::Ok(Value::none())
        }
    }
}

/// Reads the slot without clearing it.
fn builtin_last_error(ctx: &mut ExecutionContext, _args: &[Value]) -> Outcome<Value> {
    Outcome::Ok(ctx.last_error.get().map_or_else(Value::none, Value::error))
}

fn builtin_isinstance(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value, class] = args else {
        return ctx.last_error.fail(arity_error("isinstance", 2, args.len()));
    };
    let ValueKind::Class(class) = class.kind() else {
        return ctx.last_error.fail(type_error("isinstance", "a class", class));
    };
    let matches = match value.kind() {
        ValueKind::Object(object) => ctx.classes.is_subclass(object.class.id, class.id),
        _ => false,
    };
    ctx.last_error.ok(Value::bool(matches))
}

fn builtin_error(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [code, message] = args else {
        return ctx.last_error.fail(arity_error("error", 2, args.len()));
    };
    let code_text = attempt!(ctx, expect_str(code, "error"));
    let Some(code) = ErrorCode::from_str_code(code_text) else {
        return ctx.last_error.err(
            ErrorCode::E0502,
            format!("unknown error code `{code_text}`"),
        );
    };
    ctx.last_error
        .ok(Value::error(Diagnostic::new(code, message.to_string())))
}

fn math_sqrt(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value] = args else {
        return ctx.last_error.fail(arity_error("sqrt", 1, args.len()));
    };
    let number = attempt!(ctx, expect_number(value, "sqrt"));
    if number < 0.0 {
        return ctx.last_error.err(
            ErrorCode::E0502,
            format!("`sqrt` of negative number {number}"),
        );
    }
    ctx.last_error.ok(Value::float(number.sqrt()))
}

fn round_with(
    ctx: &mut ExecutionContext,
    args: &[Value],
    name: &str,
    round: fn(f64) -> f64,
) -> Outcome<Value> {
    let [value] = args else {
        return ctx.last_error.fail(arity_error(name, 1, args.len()));
    };
    if let Some(n) = value.as_int() {
        return ctx.last_error.ok(Value::int(n));
    }
    let number = attempt!(ctx, expect_number(value, name));
    let rounded = attempt!(ctx, float_to_int(round(number), name));
    ctx.last_error.ok(Value::int(rounded))
}

fn math_floor(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    round_with(ctx, args, "floor", f64::floor)
}

fn math_ceil(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    round_with(ctx, args, "ceil", f64::ceil)
}

fn math_abs(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value] = args else {
        return ctx.last_error.fail(arity_error("abs", 1, args.len()));
    };
    match value.kind() {
        ValueKind::Int(n) => match n.checked_abs() {
            Some(abs) => ctx.last_error.ok(Value::int(abs)),
            None => ctx.last_error.err(ErrorCode::E0304, "integer overflow in `abs`"),
        },
        ValueKind::Float(f) => ctx.last_error.ok(Value::float(f.abs())),
        _ => ctx.last_error.fail(type_error("abs", "a number", value)),
    }
}

fn math_pow(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [base, exponent] = args else {
        return ctx.last_error.fail(arity_error("pow", 2, args.len()));
    };
    if let (Some(b), Some(e)) = (base.as_int(), exponent.as_int()) {
        if let Ok(e) = u32::try_from(e) {
            return match b.checked_pow(e) {
                Some(result) => ctx.last_error.ok(Value::int(result)),
                None => ctx.last_error.err(ErrorCode::E0304, "integer overflow in `pow`"),
            };
        }
    }
    let b = attempt!(ctx, expect_number(base, "pow"));
    let e = attempt!(ctx, expect_number(exponent, "pow"));
    ctx.last_error.ok(Value::float(b.powf(e)))
}

/// Shared body of `min` / `max`: returns the winning argument unchanged.
fn extremum(
    ctx: &mut ExecutionContext,
    args: &[Value],
    name: &str,
    prefer: fn(f64, f64) -> bool,
) -> Outcome<Value> {
    let Some((first, rest)) = args.split_first() else {
        return ctx.last_error.err(
            ErrorCode::E0501,
            format!("`{name}` expects at least one argument"),
        );
    };
    let mut best = first;
    let mut best_number = attempt!(ctx, expect_number(first, name));
    for candidate in rest {
        let number = attempt!(ctx, expect_number(candidate, name));
        if prefer(number, best_number) {
            best = candidate;
            best_number = number;
        }
    }
    ctx.last_error.ok(best.clone())
}

fn math_min(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    extremum(ctx, args, "min", |candidate, best| candidate < best)
}

fn math_max(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    extremum(ctx, args, "max", |candidate, best| candidate > best)
}

fn map_string(
    ctx: &mut ExecutionContext,
    args: &[Value],
    name: &str,
    map: fn(&str) -> String,
) -> Outcome<Value> {
    let [value] = args else {
        return ctx.last_error.fail(arity_error(name, 1, args.len()));
    };
    let text = attempt!(ctx, expect_str(value, name));
    ctx.last_error.ok(Value::string(map(text)))
}

fn string_upper(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    map_string(ctx, args, "upper", str::to_uppercase)
}

fn string_lower(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    map_string(ctx, args, "lower", str::to_lowercase)
}

fn string_trim(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    map_string(ctx, args, "trim", |text| text.trim().to_string())
}

fn string_split(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value, separator] = args else {
        return ctx.last_error.fail(arity_error("split", 2, args.len()));
    };
    let text = attempt!(ctx, expect_str(value, "split"));
    let separator = attempt!(ctx, expect_str(separator, "split"));
    if separator.is_empty() {
        return ctx.last_error.err(ErrorCode::E0502, "`split` separator cannot be empty");
    }
    let parts = text.split(separator).map(Value::string).collect();
    ctx.last_error.ok(Value::list(parts))
}

fn string_join(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [list, separator] = args else {
        return ctx.last_error.fail(arity_error("join", 2, args.len()));
    };
    let items = attempt!(ctx, expect_list(list, "join"));
    let separator = attempt!(ctx, expect_str(separator, "join"));
    let joined = items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator);
    ctx.last_error.ok(Value::string(joined))
}

fn string_replace(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value, from, to] = args else {
        return ctx.last_error.fail(arity_error("replace", 3, args.len()));
    };
    let text = attempt!(ctx, expect_str(value, "replace"));
    let from = attempt!(ctx, expect_str(from, "replace"));
    let to = attempt!(ctx, expect_str(to, "replace"));
    ctx.last_error.ok(Value::string(text.replace(from, to)))
}

fn string_contains(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [value, needle] = args else {
        return ctx.last_error.fail(arity_error("contains", 2, args.len()));
    };
    let text = attempt!(ctx, expect_str(value, "contains"));
    let needle = attempt!(ctx, expect_str(needle, "contains"));
    ctx.last_error.ok(Value::bool(text.contains(needle)))
}

fn collections_push(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [list, item] = args else {
        return ctx.last_error.fail(arity_error("push", 2, args.len()));
    };
    match list.kind() {
        ValueKind::List(items) => {
            items.borrow_mut().push(item.clone());
            ctx.last_error.ok(list.clone())
        }
        _ => ctx.last_error.fail(type_error("push", "List", list)),
    }
}

fn collections_pop(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [list] = args else {
        return ctx.last_error.fail(arity_error("pop", 1, args.len()));
    };
    let ValueKind::List(items) = list.kind() else {
        return ctx.last_error.fail(type_error("pop", "List", list));
    };
    let popped = items.borrow_mut().pop();
    match popped {
        Some(value) => ctx.last_error.ok(value),
        None => ctx.last_error.err(ErrorCode::E0302, "pop from empty list"),
    }
}

fn collections_reverse(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [list] = args else {
        return ctx.last_error.fail(arity_error("reverse", 1, args.len()));
    };
    let mut items = attempt!(ctx, expect_list(list, "reverse"));
    items.reverse();
    ctx.last_error.ok(Value::list(items))
}

fn collections_sum(ctx: &mut ExecutionContext, args: &[Value]) -> Outcome<Value> {
    let [list] = args else {
        return ctx.last_error.fail(arity_error("sum", 1, args.len()));
    };
    let items = attempt!(ctx, expect_list(list, "sum"));
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0;
    for item in &items {
        match item.kind() {
            ValueKind::Int(n) => {
                int_total = match int_total {
                    Some(total) => match total.checked_add(*n) {
                        Some(sum) => Some(sum),
                        None => {
                            return ctx.last_error.err(ErrorCode::E0304, "integer overflow in `sum`");
                        }
                    },
                    None => None,
                };
                float_total += *n as f64;
            }
            ValueKind::Float(f) => {
                int_total = None;
                float_total += f;
            }
            _ => return ctx.last_error.fail(type_error("sum", "a list of numbers", item)),
        }
    }
    let total = match int_total {
        Some(total) => Value::int(total),
        None => Value::float(float_total),
    };
    ctx.last_error.ok(total)
}
