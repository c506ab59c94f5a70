use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::Stmt,
    diagnostics::{SourceSpan, SourceText},
    value::{FunctionDef, Value},
};

pub type Frame = IndexMap<String, Value>;

/// Stack of variable frames; the global frame sits at index 0 and is never
/// popped. Only function calls push frames.
#[derive(Debug)]
pub struct Scopes {
    frames: Vec<Frame>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.frames.push(Frame::new());
    }

    pub fn pop_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bind `name` in the innermost frame, replacing any local binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.innermost_mut().insert(name.into(), value);
    }

    /// Rebind the nearest frame that already holds `name`, otherwise define
    /// it in the innermost frame.
    pub fn assign(&mut self, name: &str, value: Value) {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return;
            }
        }
        self.define(name, value);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).cloned())
    }

    /// Binding held by the innermost frame only.
    pub fn local(&self, name: &str) -> Option<Value> {
        self.frames.last().and_then(|frame| frame.get(name).cloned())
    }

    pub fn remove_local(&mut self, name: &str) {
        self.innermost_mut().shift_remove(name);
    }

    /// Every name reachable from the innermost frame, innermost first.
    pub fn visible_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for frame in self.frames.iter().rev() {
            for name in frame.keys() {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn globals(&self) -> &Frame {
        &self.frames[0]
    }

    fn innermost_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

/// Global table of free functions, alive for the whole program.
#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: IndexMap<String, Rc<FunctionDef>>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a free function and return its shared definition.
    pub fn define_function(
        &mut self,
        name: &str,
        params: Vec<String>,
        body: Rc<[Stmt]>,
        span: SourceSpan,
        source: Rc<SourceText>,
    ) -> Rc<FunctionDef> {
        let def = Rc::new(FunctionDef {
            name: name.to_string(),
            params,
            body,
            span,
            owner: None,
            source,
        });
        self.functions.insert(name.to_string(), Rc::clone(&def));
        def
    }

    pub fn lookup_function(&self, name: &str) -> Option<Rc<FunctionDef>> {
        self.functions.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
