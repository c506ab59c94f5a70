use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::Stmt,
    diagnostics::{Diagnostic, SourceSpan, SourceText},
    object::{ClassId, ClassRef, Object, ObjectRef},
    outcome::Outcome,
    runtime::ExecutionContext,
    stack::ensure_sufficient_stack,
};

/// Largest string (in bytes) or list (in items) a single operation may
/// build; larger requests are E0502.
pub const MAX_SEQUENCE_LEN: usize = 1 << 24;

#[derive(Clone)]
pub struct Value(pub Rc<ValueKind>);

pub enum ValueKind {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(RefCell<Vec<Value>>),
    Dict(RefCell<IndexMap<DictKey, Value>>),
    Function(Callable),
    Class(ClassRef),
    Object(ObjectRef),
    Error(Diagnostic),
    Module(ModuleValue),
    Super(SuperProxy),
}

/// Hashable subset of values usable as dict keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    Int(i64),
    Str(String),
    Bool(bool),
}

impl DictKey {
    pub fn from_value(value: &Value) -> Option<DictKey> {
        match &*value.0 {
            ValueKind::Int(n) => Some(DictKey::Int(*n)),
            ValueKind::String(s) => Some(DictKey::Str(s.clone())),
            ValueKind::Bool(b) => Some(DictKey::Bool(*b)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DictKey::Int(n) => Value::int(*n),
            DictKey::Str(s) => Value::string(s.clone()),
            DictKey::Bool(b) => Value::bool(*b),
        }
    }
}

impl fmt::Display for DictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictKey::Int(n) => write!(f, "{n}"),
            DictKey::Str(s) => write!(f, "{s:?}"),
            DictKey::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A user function: free function, method, or property accessor.
#[derive(Debug)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<[Stmt]>,
    pub span: SourceSpan,
    /// Defining class for methods, class methods and accessors.
    pub owner: Option<ClassId>,
    /// Text the body was parsed from; errors raised inside it render
    /// against this rather than whatever the caller is running.
    pub source: Rc<SourceText>,
}

pub type NativeCallback = fn(&mut ExecutionContext, &[Value]) -> Outcome<Value>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    /// `None` accepts any number of arguments.
    pub arity: Option<usize>,
    pub callback: NativeCallback,
}

#[derive(Clone)]
pub enum Callable {
    User(Rc<FunctionDef>),
    /// Method with its receiver (an instance, or a class for class methods)
    /// supplied as the first argument.
    Bound {
        receiver: Value,
        function: Rc<FunctionDef>,
    },
    Native(NativeFunction),
    /// Builtin method on a list, dict or string; the receiver is passed
    /// as the first argument.
    NativeBound {
        receiver: Value,
        function: NativeFunction,
    },
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::User(def) | Callable::Bound { function: def, .. } => &def.name,
            Callable::Native(native) | Callable::NativeBound { function: native, .. } => {
                native.name
            }
        }
    }

    /// Number of arguments the caller must supply, excluding any receiver.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Callable::User(def) => Some(def.params.len()),
            Callable::Bound { function, .. } => Some(function.params.len().saturating_sub(1)),
            Callable::Native(native) => native.arity,
            Callable::NativeBound { function, .. } => {
                function.arity.map(|arity| arity.saturating_sub(1))
            }
        }
    }
}

#[derive(Clone)]
pub struct ModuleValue {
    pub name: String,
    pub exports: IndexMap<String, Value>,
}

/// Result of `super()`: the class whose method is running and the receiver.
#[derive(Clone)]
pub struct SuperProxy {
    pub class: ClassRef,
    pub receiver: Value,
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn none() -> Self {
        Self::new(ValueKind::None)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ValueKind::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ValueKind::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String(value.into()))
    }

    pub fn list(values: Vec<Value>) -> Self {
        Self::new(ValueKind::List(RefCell::new(values)))
    }

    pub fn dict(entries: IndexMap<DictKey, Value>) -> Self {
        Self::new(ValueKind::Dict(RefCell::new(entries)))
    }

    pub fn function(callable: Callable) -> Self {
        Self::new(ValueKind::Function(callable))
    }

    pub fn class(class: ClassRef) -> Self {
        Self::new(ValueKind::Class(class))
    }

    pub fn object(object: Object) -> Self {
        Self::new(ValueKind::Object(Rc::new(object)))
    }

    pub fn error(diagnostic: Diagnostic) -> Self {
        Self::new(ValueKind::Error(diagnostic))
    }

    pub fn module(name: impl Into<String>, exports: IndexMap<String, Value>) -> Self {
        Self::new(ValueKind::Module(ModuleValue {
            name: name.into(),
            exports,
        }))
    }

    pub fn kind(&self) -> &ValueKind {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        matches!(&*self.0, ValueKind::None)
    }

    pub fn as_int(&self) -> Option<i64> {
        match &*self.0 {
            ValueKind::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match &*self.0 {
            ValueKind::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &*self.0 {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &*self.0 {
            ValueKind::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Int or Float widened to `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match &*self.0 {
            ValueKind::Int(n) => Some(*n as f64),
            ValueKind::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Snapshot of a list's elements.
    pub fn list_items(&self) -> Option<Vec<Value>> {
        match &*self.0 {
            ValueKind::List(items) => Some(items.borrow().clone()),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match &*self.0 {
            ValueKind::None => false,
            ValueKind::Bool(b) => *b,
            ValueKind::Int(n) => *n != 0,
            ValueKind::Float(f) => *f != 0.0,
            ValueKind::String(s) => !s.is_empty(),
            ValueKind::List(items) => !items.borrow().is_empty(),
            ValueKind::Dict(map) => !map.borrow().is_empty(),
            ValueKind::Function(_)
            | ValueKind::Class(_)
            | ValueKind::Object(_)
            | ValueKind::Error(_)
            | ValueKind::Module(_)
            | ValueKind::Super(_) => true,
        }
    }

    pub fn type_name(&self) -> &str {
        match &*self.0 {
            ValueKind::None => "None",
            ValueKind::Bool(_) => "Bool",
            ValueKind::Int(_) => "Int",
            ValueKind::Float(_) => "Float",
            ValueKind::String(_) => "String",
            ValueKind::List(_) => "List",
            ValueKind::Dict(_) => "Dict",
            ValueKind::Function(_) => "Function",
            ValueKind::Class(_) => "Class",
            ValueKind::Object(object) => object.class.name.as_ref(),
            ValueKind::Error(_) => "Error",
            ValueKind::Module(_) => "Module",
            ValueKind::Super(_) => "Super",
        }
    }

    /// Structural equality; numbers compare across Int and Float, objects
    /// and classes by identity.
    pub fn equals(&self, other: &Value) -> bool {
        self.equals_within(other, &mut Vec::new())
    }

    /// Structural equality. `visiting` holds the container pairs already
    /// under comparison; meeting one again compares equal, so
    /// self-containing lists terminate.
    fn equals_within(&self, other: &Value, visiting: &mut Vec<(*const ValueKind, *const ValueKind)>) -> bool {
        match (&*self.0, &*other.0) {
            (ValueKind::None, ValueKind::None) => true,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Int(b)) => a == b,
            (ValueKind::Int(_) | ValueKind::Float(_), ValueKind::Int(_) | ValueKind::Float(_)) => {
                self.as_number() == other.as_number()
            }
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            (ValueKind::List(_), ValueKind::List(_)) | (ValueKind::Dict(_), ValueKind::Dict(_))
                if Rc::ptr_eq(&self.0, &other.0) =>
            {
                true
            }
            (ValueKind::List(a), ValueKind::List(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && self.descend(other, visiting, |visiting| {
                        a.iter().zip(b.iter()).all(|(l, r)| l.equals_within(r, visiting))
                    })
            }
            (ValueKind::Dict(a), ValueKind::Dict(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && self.descend(other, visiting, |visiting| {
                        a.iter().all(|(key, value)| {
                            b.get(key).is_some_and(|rhs| value.equals_within(rhs, visiting))
                        })
                    })
            }
            (ValueKind::Class(a), ValueKind::Class(b)) => a.id == b.id,
            (ValueKind::Object(a), ValueKind::Object(b)) => Rc::ptr_eq(a, b),
            (ValueKind::Error(a), ValueKind::Error(b)) => a.code == b.code && a.message == b.message,
            (ValueKind::Function(a), ValueKind::Function(b)) => match (a, b) {
                (Callable::User(a), Callable::User(b)) => Rc::ptr_eq(a, b),
                (Callable::Native(a), Callable::Native(b)) => a.name == b.name,
                _ => false,
            },
            _ => false,
        }
    }

    fn descend(
        &self,
        other: &Value,
        visiting: &mut Vec<(*const ValueKind, *const ValueKind)>,
        compare: impl FnOnce(&mut Vec<(*const ValueKind, *const ValueKind)>) -> bool,
    ) -> bool {
        let pair = (Rc::as_ptr(&self.0), Rc::as_ptr(&other.0));
        if visiting.contains(&pair) {
            return true;
        }
        visiting.push(pair);
        let same = ensure_sufficient_stack(|| compare(visiting));
        visiting.pop();
        same
    }

    /// Rendering used inside containers: strings are quoted.
    pub fn repr(&self) -> String {
        match &*self.0 {
            ValueKind::String(s) => format!("{s:?}"),
            _ => self.to_string(),
        }
    }

    fn write_repr(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ValueKind>) -> fmt::Result {
        match &*self.0 {
            ValueKind::String(s) => write!(f, "{s:?}"),
            _ => ensure_sufficient_stack(|| self.write_display(f, open)),
        }
    }

    /// `open` holds the containers currently being written; a container
    /// that reaches itself again is shown as `[...]` or `{...}`.
    fn write_display(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ValueKind>) -> fmt::Result {
        let id = Rc::as_ptr(&self.0);
        match &*self.0 {
            ValueKind::None => write!(f, "none"),
            ValueKind::Bool(b) => write!(f, "{b}"),
            ValueKind::Int(n) => write!(f, "{n}"),
            ValueKind::Float(n) => write!(f, "{n:?}"),
            ValueKind::String(s) => write!(f, "{s}"),
            ValueKind::List(_) if open.contains(&id) => write!(f, "[...]"),
            ValueKind::Dict(_) if open.contains(&id) => write!(f, "{{...}}"),
            ValueKind::List(items) => {
                open.push(id);
                write!(f, "[")?;
                for (idx, value) in items.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    value.write_repr(f, open)?;
                }
                open.pop();
                write!(f, "]")
            }
            ValueKind::Dict(map) => {
                open.push(id);
                write!(f, "{{")?;
                for (idx, (key, value)) in map.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: ")?;
                    value.write_repr(f, open)?;
                }
                open.pop();
                write!(f, "}}")
            }
            ValueKind::Function(Callable::User(def)) => write!(f, "<func {}>", def.name),
            ValueKind::Function(Callable::Bound { function, .. }) => {
                write!(f, "<bound method {}>", function.name)
            }
            ValueKind::Function(Callable::Native(native))
            | ValueKind::Function(Callable::NativeBound {
                function: native, ..
            }) => write!(f, "<builtin {}>", native.name),
            ValueKind::Class(class) => write!(f, "<class {}>", class.name),
            ValueKind::Object(object) => write!(f, "<{} object>", object.class.name),
            ValueKind::Error(diag) => write!(f, "error[{}]: {}", diag.code, diag.message),
            ValueKind::Module(module) => write!(f, "<module {}>", module.name),
            ValueKind::Super(proxy) => write!(f, "<super of {}>", proxy.class.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::String(s) => write!(f, "{s:?}"),
            ValueKind::Object(object) => f
                .debug_struct(object.class.name.as_ref())
                .field("attributes", &object.attributes.borrow().keys().collect::<Vec<_>>())
                .finish(),
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_display(f, &mut Vec::new())
    }
}
