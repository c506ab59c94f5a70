use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use super::{Eval, FlowControl, Interpreter};
use crate::{
    ast::{ClassDecl, ClassMember, FunctionDecl},
    diagnostics::{Diagnostic, SourceSpan, SourceText},
    error_code::ErrorCode,
    object::{Class, ClassId, ClassRef, ObjectRef, Property, SuperMember},
    stdlib, suggest,
    value::{Callable, DictKey, FunctionDef, SuperProxy, Value, ValueKind},
};

fn method_def(decl: &FunctionDecl, owner: Option<ClassId>, source: &Rc<SourceText>) -> Rc<FunctionDef> {
    Rc::new(FunctionDef {
        name: decl.name.clone(),
        params: decl.params.clone(),
        body: Rc::clone(&decl.body),
        span: decl.span,
        owner,
        source: Rc::clone(source),
    })
}

fn bound(receiver: Value, function: Rc<FunctionDef>) -> Value {
    Value::function(Callable::Bound { receiver, function })
}

fn missing_attribute(message: String, name: &str, candidates: &[String], span: SourceSpan) -> Diagnostic {
    let diagnostic = Diagnostic::new(ErrorCode::E0403, message).with_span(span);
    match suggest::did_you_mean(name, candidates.iter().map(String::as_str)) {
        Some(help) => diagnostic.with_suggestion(help),
        None => diagnostic,
    }
}

pub(super) fn dict_key(value: &Value, span: SourceSpan) -> Eval<DictKey> {
    DictKey::from_value(value).ok_or_else(|| {
        Diagnostic::new(
            ErrorCode::E0201,
            format!("dict keys must be Int, String or Bool, found {}", value.type_name()),
        )
        .with_span(span)
    })
}

/// Normalise a possibly negative index against `len`.
fn position(index: &Value, len: usize, span: SourceSpan) -> Eval<usize> {
    let raw = index.as_int().ok_or_else(|| {
        Diagnostic::new(
            ErrorCode::E0201,
            format!("index must be Int, found {}", index.type_name()),
        )
        .with_span(span)
    })?;
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let adjusted = if raw < 0 { raw + len_i } else { raw };
    if adjusted < 0 || adjusted >= len_i {
        return Err(Diagnostic::new(
            ErrorCode::E0302,
            format!("index {raw} out of range for length {len}"),
        )
        .with_span(span));
    }
    Ok(adjusted as usize)
}

pub(super) fn index_value(target: &Value, index: &Value, span: SourceSpan) -> Eval<Value> {
    match target.kind() {
        ValueKind::List(items) => {
            let items = items.borrow();
            let idx = position(index, items.len(), span)?;
            Ok(items[idx].clone())
        }
        ValueKind::String(text) => {
            let chars: Vec<char> = text.chars().collect();
            let idx = position(index, chars.len(), span)?;
            Ok(Value::string(chars[idx].to_string()))
        }
        ValueKind::Dict(map) => {
            let key = dict_key(index, span)?;
            map.borrow().get(&key).cloned().ok_or_else(|| {
                Diagnostic::new(ErrorCode::E0303, format!("key {key} not found")).with_span(span)
            })
        }
        _ => Err(Diagnostic::new(
            ErrorCode::E0201,
            format!("`{}` value is not indexable", target.type_name()),
        )
        .with_span(span)),
    }
}

pub(super) fn set_index(target: &Value, index: &Value, value: Value, span: SourceSpan) -> Eval<()> {
    match target.kind() {
        ValueKind::List(items) => {
            let mut items = items.borrow_mut();
            let idx = position(index, items.len(), span)?;
            items[idx] = value;
            Ok(())
        }
        ValueKind::Dict(map) => {
            let key = dict_key(index, span)?;
            map.borrow_mut().insert(key, value);
            Ok(())
        }
        _ => Err(Diagnostic::new(
            ErrorCode::E0201,
            format!("`{}` value does not support item assignment", target.type_name()),
        )
        .with_span(span)),
    }
}

impl Interpreter {
    pub(super) fn define_class(&mut self, decl: &ClassDecl, span: SourceSpan) -> Eval<FlowControl> {
        let mut bases = Vec::with_capacity(decl.bases.len());
        for (base, base_span) in &decl.bases {
            match self.context.classes.lookup(base) {
                Some(id) => bases.push(id),
                None => {
                    let diagnostic =
                        Diagnostic::new(ErrorCode::E0404, format!("undefined class `{base}`"))
                            .with_span(*base_span);
                    let classes: Vec<&str> = self.context.classes.names().collect();
                    return Err(match suggest::did_you_mean(base, classes) {
                        Some(help) => diagnostic.with_suggestion(help),
                        None => diagnostic,
                    });
                }
            }
        }

        // Defaults may run arbitrary code, so evaluate them before an id is
        // handed out.
        let mut instance_defaults = IndexMap::new();
        for member in &decl.members {
            if let ClassMember::Field { name, value, .. } = member {
                let value = self.evaluate(value)?;
                instance_defaults.insert(name.clone(), value);
            }
        }

        if self.context.classes.contains(&decl.name) {
            self.context.warn(
                Diagnostic::new(ErrorCode::W0002, format!("class `{}` redefined", decl.name))
                    .with_span(span),
            );
        }

        let source = Rc::clone(&self.context.source);
        let registry = &mut self.context.classes;
        let id = registry.next_id();
        let mut class = Class {
            id,
            name: Rc::from(decl.name.as_str()),
            mro: registry.compute_mro(id, &bases),
            bases,
            methods: IndexMap::new(),
            static_methods: IndexMap::new(),
            class_methods: IndexMap::new(),
            properties: IndexMap::new(),
            instance_defaults,
        };
        for member in &decl.members {
            match member {
                ClassMember::Method(method) => {
                    class.methods.insert(method.name.clone(), method_def(method, Some(id), &source));
                }
                ClassMember::StaticMethod(method) => {
                    class.static_methods.insert(method.name.clone(), method_def(method, None, &source));
                }
                ClassMember::ClassMethod(method) => {
                    class.class_methods.insert(method.name.clone(), method_def(method, Some(id), &source));
                }
                ClassMember::Property(property) => {
                    class.properties.insert(
                        property.name.clone(),
                        Property {
                            getter: property.getter.as_ref().map(|get| method_def(get, Some(id), &source)),
                            setter: property.setter.as_ref().map(|set| method_def(set, Some(id), &source)),
                        },
                    );
                }
                ClassMember::Field { .. } => {}
            }
        }
        registry.insert(class);
        debug!(class = %decl.name, mro = ?registry.mro_names(id), "defined class");
        Ok(FlowControl::Next)
    }

    pub(super) fn eval_super(&self, span: SourceSpan) -> Eval<Value> {
        let frame = self.context.method_stack.last().ok_or_else(|| {
            Diagnostic::new(ErrorCode::E0404, "`super()` used outside of a method").with_span(span)
        })?;
        Ok(Value::new(ValueKind::Super(SuperProxy {
            class: self.context.classes.get(frame.class).handle(),
            receiver: frame.receiver.clone(),
        })))
    }

    pub(super) fn get_attribute(&mut self, target: &Value, name: &str, span: SourceSpan) -> Eval<Value> {
        match target.kind() {
            ValueKind::Object(object) => self.instance_attribute(target, object, name, span),
            ValueKind::Class(class) => self.class_attribute(class, name, span),
            ValueKind::Super(proxy) => self.super_attribute(proxy, name, span),
            ValueKind::Module(module) => module.exports.get(name).cloned().ok_or_else(|| {
                let diagnostic = Diagnostic::new(
                    ErrorCode::E0102,
                    format!("module `{}` has no member `{name}`", module.name),
                )
                .with_span(span);
                match suggest::did_you_mean(name, module.exports.keys().map(String::as_str)) {
                    Some(help) => diagnostic.with_suggestion(help),
                    None => diagnostic,
                }
            }),
            ValueKind::Error(diagnostic) => match name {
                "code" => Ok(Value::string(diagnostic.code.as_str())),
                "message" => Ok(Value::string(diagnostic.message.clone())),
                "line" => Ok(diagnostic
                    .location
                    .as_ref()
                    .and_then(|location| i64::try_from(location.line).ok())
                    .map_or_else(Value::none, Value::int)),
                _ => Err(missing_attribute(
                    format!("`Error` value has no attribute `{name}`"),
                    name,
                    &["code".into(), "message".into(), "line".into()],
                    span,
                )),
            },
            ValueKind::List(_) | ValueKind::Dict(_) | ValueKind::String(_) => {
                if let Some(function) = stdlib::value_method(target, name) {
                    return Ok(Value::function(Callable::NativeBound {
                        receiver: target.clone(),
                        function,
                    }));
                }
                if let ValueKind::Dict(map) = target.kind() {
                    if let Some(value) = map.borrow().get(&DictKey::Str(name.to_string())) {
                        return Ok(value.clone());
                    }
                }
                Err(missing_attribute(
                    format!("`{}` value has no attribute `{name}`", target.type_name()),
                    name,
                    &stdlib::value_method_names(target),
                    span,
                ))
            }
            _ => Err(missing_attribute(
                format!("`{}` value has no attribute `{name}`", target.type_name()),
                name,
                &[],
                span,
            )),
        }
    }

    /// Own attributes, bound method, property getter, static method, then
    /// class method bound to the class.
    fn instance_attribute(
        &mut self,
        receiver: &Value,
        object: &ObjectRef,
        name: &str,
        span: SourceSpan,
    ) -> Eval<Value> {
        if let Some(value) = object.attributes.borrow().get(name) {
            return Ok(value.clone());
        }
        let classes = &self.context.classes;
        let id = object.class.id;
        if let Some(method) = classes.find_method(id, name) {
            return Ok(bound(receiver.clone(), method));
        }
        if let Some(property) = classes.find_property(id, name) {
            return match property.getter {
                Some(getter) => self.call_function(&getter, vec![receiver.clone()], span),
                None => Err(Diagnostic::new(
                    ErrorCode::E0403,
                    format!("property `{name}` of `{}` has no getter", object.class.name),
                )
                .with_span(span)),
            };
        }
        if let Some(method) = classes.find_static(id, name) {
            return Ok(Value::function(Callable::User(method)));
        }
        if let Some(method) = classes.find_class_method(id, name) {
            return Ok(bound(Value::class(object.class.clone()), method));
        }
        let mut candidates: Vec<String> = object.attributes.borrow().keys().cloned().collect();
        candidates.extend(classes.member_names(id));
        Err(missing_attribute(
            format!("`{}` object has no attribute `{name}`", object.class.name),
            name,
            &candidates,
            span,
        ))
    }

    fn class_attribute(&self, class: &ClassRef, name: &str, span: SourceSpan) -> Eval<Value> {
        let classes = &self.context.classes;
        if let Some(method) = classes.find_static(class.id, name) {
            return Ok(Value::function(Callable::User(method)));
        }
        if let Some(method) = classes.find_class_method(class.id, name) {
            return Ok(bound(Value::class(class.clone()), method));
        }
        if let Some(method) = classes.find_method(class.id, name) {
            return Ok(Value::function(Callable::User(method)));
        }
        if let Some(value) = classes.find_default(class.id, name) {
            return Ok(value);
        }
        Err(missing_attribute(
            format!("class `{}` has no attribute `{name}`", class.name),
            name,
            &classes.member_names(class.id),
            span,
        ))
    }

    fn super_attribute(&mut self, proxy: &SuperProxy, name: &str, span: SourceSpan) -> Eval<Value> {
        match self.context.classes.find_after(proxy.class.id, name) {
            Some(SuperMember::Method(method)) => Ok(bound(proxy.receiver.clone(), method)),
            Some(SuperMember::Property(property)) => match property.getter {
                Some(getter) => self.call_function(&getter, vec![proxy.receiver.clone()], span),
                None => Err(Diagnostic::new(
                    ErrorCode::E0403,
                    format!("property `{name}` has no getter"),
                )
                .with_span(span)),
            },
            Some(SuperMember::Static(method)) => Ok(Value::function(Callable::User(method))),
            Some(SuperMember::ClassMethod(method)) => {
                let class = match proxy.receiver.kind() {
                    ValueKind::Object(object) => Value::class(object.class.clone()),
                    _ => proxy.receiver.clone(),
                };
                Ok(bound(class, method))
            }
            None => Err(Diagnostic::new(
                ErrorCode::E0403,
                format!("`super()` of `{}` has no attribute `{name}`", proxy.class.name),
            )
            .with_span(span)),
        }
    }

    /// Property setters run first; a property without one is read-only.
    pub(super) fn set_attribute(
        &mut self,
        target: &Value,
        name: &str,
        value: Value,
        span: SourceSpan,
    ) -> Eval<()> {
        match target.kind() {
            ValueKind::Object(object) => {
                if let Some(property) = self.context.classes.find_property(object.class.id, name) {
                    return match property.setter {
                        Some(setter) => self
                            .call_function(&setter, vec![target.clone(), value], span)
                            .map(|_| ()),
                        None => Err(Diagnostic::new(
                            ErrorCode::E0403,
                            format!("property `{name}` of `{}` is read-only", object.class.name),
                        )
                        .with_span(span)),
                    };
                }
                object.attributes.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            ValueKind::Dict(map) => {
                map.borrow_mut().insert(DictKey::Str(name.to_string()), value);
                Ok(())
            }
            _ => Err(Diagnostic::new(
                ErrorCode::E0403,
                format!("cannot set attribute `{name}` on `{}` value", target.type_name()),
            )
            .with_span(span)),
        }
    }
}
