use std::{cell::RefCell, rc::Rc};

use tracing::{debug, trace};

use super::{Eval, FlowControl, Interpreter, MethodFrame, loop_control_outside};
use crate::{
    ast::{Expr, ExprKind, Stmt},
    diagnostics::{Diagnostic, SourceSpan},
    error_code::ErrorCode,
    object::{ClassRef, Object},
    stack::ensure_sufficient_stack,
    value::{Callable, FunctionDef, NativeFunction, Value, ValueKind},
};

pub(crate) fn arity_error(name: &str, expected: usize, got: usize) -> Diagnostic {
    Diagnostic::new(
        ErrorCode::E0501,
        format!("wrong number of arguments to `{name}`: expected {expected}, got {got}"),
    )
}

fn check_arity(name: &str, expected: Option<usize>, got: usize, span: SourceSpan) -> Eval<()> {
    match expected {
        Some(expected) if expected != got => Err(arity_error(name, expected, got).with_span(span)),
        _ => Ok(()),
    }
}

/// How a call site refers to its callee, for "not callable" messages.
fn callee_label(callee: &Expr, value: &Value) -> String {
    match &callee.kind {
        ExprKind::Variable(name) => name.clone(),
        ExprKind::Field { field, .. } => field.clone(),
        _ => value.type_name().to_string(),
    }
}

impl Interpreter {
    /// `callee(args)`: resolve, check arity, evaluate arguments in the
    /// caller's scope, then dispatch.
    pub(super) fn eval_call(&mut self, callee: &Expr, args: &[Expr], span: SourceSpan) -> Eval<Value> {
        let target = match &callee.kind {
            ExprKind::Variable(name) => self.resolve_callee(name, callee.span)?,
            _ => self.evaluate(callee)?,
        };
        match self.signature(&target) {
            Some((name, expected)) => check_arity(&name, expected, args.len(), span)?,
            None => {
                return Err(Diagnostic::new(
                    ErrorCode::E0202,
                    format!("`{}` is not callable", callee_label(callee, &target)),
                )
                .with_span(callee.span));
            }
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg)?);
        }
        self.call_value(&target, values, span)
    }

    /// The function table wins over every other binding for call heads.
    fn resolve_callee(&self, name: &str, span: SourceSpan) -> Eval<Value> {
        if let Some(def) = self.context.functions.lookup_function(name) {
            return Ok(Value::function(Callable::User(def)));
        }
        self.context.lookup_name(name).ok_or_else(|| {
            self.context.with_name_suggestion(
                Diagnostic::new(ErrorCode::E0402, format!("undefined function `{name}`"))
                    .with_span(span),
                name,
            )
        })
    }

    /// Display name and expected argument count, or `None` when the value
    /// cannot be called.
    fn signature(&self, value: &Value) -> Option<(String, Option<usize>)> {
        match value.kind() {
            ValueKind::Function(callable) => Some((callable.name().to_string(), callable.arity())),
            ValueKind::Class(class) => Some((class.name.to_string(), Some(self.init_arity(class)))),
            _ => None,
        }
    }

    fn init_arity(&self, class: &ClassRef) -> usize {
        self.context
            .classes
            .find_method(class.id, "__init__")
            .map_or(0, |init| init.params.len().saturating_sub(1))
    }

    pub(crate) fn call_value(&mut self, callee: &Value, args: Vec<Value>, span: SourceSpan) -> Eval<Value> {
        match callee.kind() {
            ValueKind::Function(Callable::User(def)) => {
                check_arity(&def.name, Some(def.params.len()), args.len(), span)?;
                self.call_function(def, args, span)
            }
            ValueKind::Function(callable @ Callable::Bound { receiver, function }) => {
                check_arity(&function.name, callable.arity(), args.len(), span)?;
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(receiver.clone());
                full.extend(args);
                self.call_function(function, full, span)
            }
            ValueKind::Function(Callable::Native(native)) => {
                check_arity(native.name, native.arity, args.len(), span)?;
                self.call_native(native, &args, span)
            }
            ValueKind::Function(callable @ Callable::NativeBound { receiver, function }) => {
                check_arity(function.name, callable.arity(), args.len(), span)?;
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(receiver.clone());
                full.extend(args);
                self.call_native(function, &full, span)
            }
            ValueKind::Class(class) => self.instantiate(class, args, span),
            _ => Err(Diagnostic::new(
                ErrorCode::E0202,
                format!("`{}` value is not callable", callee.type_name()),
            )
            .with_span(span)),
        }
    }

    /// Invoke a user function with already-checked arguments. The frame
    /// pushed here is popped on every exit path.
    pub(crate) fn call_function(
        &mut self,
        def: &Rc<FunctionDef>,
        args: Vec<Value>,
        span: SourceSpan,
    ) -> Eval<Value> {
        let limit = self.context.config.max_call_depth;
        if self.context.call_depth >= limit {
            return Err(Diagnostic::new(
                ErrorCode::E0306,
                format!("maximum call depth of {limit} exceeded calling `{}`", def.name),
            )
            .with_span(span));
        }

        let method_frame = def.owner.zip(args.first().cloned());
        self.context.call_depth += 1;
        self.context.scopes.push_scope();
        for (param, value) in def.params.iter().zip(args) {
            self.context.scopes.define(param.as_str(), value);
        }
        if let Some((class, receiver)) = method_frame.clone() {
            self.context.method_stack.push(MethodFrame { class, receiver });
        }
        debug!(function = %def.name, depth = self.context.call_depth, "call");

        let caller_source = std::mem::replace(&mut self.context.source, Rc::clone(&def.source));
        let result = ensure_sufficient_stack(|| self.execute_body(&def.body))
            .map_err(|diagnostic| diagnostic.with_source_text(&def.source));

        self.context.source = caller_source;
        if method_frame.is_some() {
            self.context.method_stack.pop();
        }
        self.context.scopes.pop_scope();
        self.context.call_depth -= 1;

        let value = result?;
        trace!(function = %def.name, result = %value, "return");
        Ok(value)
    }

    /// A function yields its `return` value, else the value of its last
    /// value-producing statement, else none.
    fn execute_body(&mut self, body: &[Stmt]) -> Eval<Value> {
        let mut last_value = Value::none();
        for stmt in body {
            match self.execute_statement(stmt)? {
                FlowControl::Next => {}
                FlowControl::NextValue(value) => last_value = value,
                FlowControl::Return(value) => return Ok(value),
                FlowControl::Break(span) => return Err(loop_control_outside("break", span)),
                FlowControl::Continue(span) => {
                    return Err(loop_control_outside("continue", span));
                }
            }
        }
        Ok(last_value)
    }

    fn call_native(&mut self, native: &NativeFunction, args: &[Value], span: SourceSpan) -> Eval<Value> {
        trace!(builtin = native.name, args = args.len(), "native call");
        (native.callback)(&mut self.context, args)
            .into_result()
            .map_err(|diagnostic| diagnostic.or_span(span))
    }

    /// Allocate an instance seeded with the class's own defaults and run
    /// `__init__` (found through the MRO) on it.
    fn instantiate(&mut self, class: &ClassRef, args: Vec<Value>, span: SourceSpan) -> Eval<Value> {
        let init = self.context.classes.find_method(class.id, "__init__");
        let expected = init
            .as_ref()
            .map_or(0, |init| init.params.len().saturating_sub(1));
        check_arity(&class.name, Some(expected), args.len(), span)?;

        let defaults = self.context.classes.get(class.id).instance_defaults.clone();
        let instance = Value::object(Object {
            class: class.clone(),
            attributes: RefCell::new(defaults),
        });
        if let Some(init) = init {
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(instance.clone());
            full.extend(args);
            self.call_function(&init, full, span)?;
        }
        debug!(class = %class.name, "instantiated");
        Ok(instance)
    }
}
