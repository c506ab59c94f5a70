use std::{
    io::{self, Write as _},
    path::Path,
    rc::Rc,
};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::{
    ast::{ConditionalStyle, Expr, ExprKind, FunctionDecl, Literal, Program, Stmt, StmtKind},
    config::InterpreterConfig,
    diagnostics::{Diagnostic, LumenError, Result, SourceSpan, SourceText},
    environment::{FunctionTable, Scopes},
    error_code::ErrorCode,
    object::{ClassId, ClassRegistry},
    outcome::LastError,
    parser,
    stack::ensure_sufficient_stack,
    stdlib, suggest,
    value::{Callable, Value, ValueKind},
};

mod calls;
mod members;
mod operators;

pub(crate) use calls::arity_error;

/// Internal evaluation result; converted to [`LumenError`] at the
/// [`Interpreter`] boundary, where file name and source text are attached.
pub(crate) type Eval<T> = std::result::Result<T, Diagnostic>;

/// Where `print` sends its lines.
#[derive(Debug)]
pub enum OutputSink {
    Stdout,
    Buffer(String),
}

/// Receiver and defining class of the method currently running; consulted
/// by `super()`.
#[derive(Debug, Clone)]
pub(crate) struct MethodFrame {
    pub class: ClassId,
    pub receiver: Value,
}

/// All mutable state of one program execution.
pub struct ExecutionContext {
    pub config: InterpreterConfig,
    pub scopes: Scopes,
    pub functions: FunctionTable,
    pub classes: ClassRegistry,
    /// Imported modules keyed by their binding name.
    pub modules: IndexMap<String, Value>,
    pub builtins: IndexMap<String, Value>,
    pub last_error: LastError,
    pub warnings: Vec<Diagnostic>,
    pub output: OutputSink,
    /// Text currently executing: the script being evaluated, or the source
    /// a running function was defined in.
    pub(crate) source: Rc<SourceText>,
    pub(crate) method_stack: Vec<MethodFrame>,
    pub(crate) call_depth: usize,
    pub(crate) steps: u64,
}

impl ExecutionContext {
    pub fn new(config: InterpreterConfig) -> Self {
        let output = if config.capture_output {
            OutputSink::Buffer(String::new())
        } else {
            OutputSink::Stdout
        };
        let source = Rc::new(SourceText::new(config.script_name.as_str(), ""));
        Self {
            config,
            scopes: Scopes::new(),
            functions: FunctionTable::new(),
            classes: ClassRegistry::new(),
            modules: IndexMap::new(),
            builtins: stdlib::builtins(),
            last_error: LastError::new(),
            warnings: Vec::new(),
            output,
            source,
            method_stack: Vec::new(),
            call_depth: 0,
            steps: 0,
        }
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        match &mut self.output {
            OutputSink::Stdout => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{line}")
            }
            OutputSink::Buffer(buffer) => {
                buffer.push_str(line);
                buffer.push('\n');
                Ok(())
            }
        }
    }

    pub fn warn(&mut self, diagnostic: Diagnostic) {
        warn!(code = %diagnostic.code, "{}", diagnostic.message);
        let diagnostic = diagnostic.with_source_text(&self.source);
        self.warnings.push(diagnostic);
    }

    /// Name lookup: scope frames, imported modules, free functions,
    /// classes, builtins. First match wins.
    pub fn lookup_name(&self, name: &str) -> Option<Value> {
        self.scopes
            .lookup(name)
            .or_else(|| self.modules.get(name).cloned())
            .or_else(|| {
                self.functions
                    .lookup_function(name)
                    .map(|def| Value::function(Callable::User(def)))
            })
            .or_else(|| {
                self.classes
                    .lookup(name)
                    .map(|id| Value::class(self.classes.get(id).handle()))
            })
            .or_else(|| self.builtins.get(name).cloned())
    }

    pub fn resolve(&self, name: &str, span: SourceSpan) -> Eval<Value> {
        self.lookup_name(name).ok_or_else(|| {
            self.with_name_suggestion(
                Diagnostic::new(ErrorCode::E0401, format!("undefined variable `{name}`"))
                    .with_span(span),
                name,
            )
        })
    }

    pub fn known_names(&self) -> Vec<&str> {
        let mut names = self.scopes.visible_names();
        names.extend(self.modules.keys().map(String::as_str));
        names.extend(self.functions.names());
        names.extend(self.classes.names());
        names.extend(self.builtins.keys().map(String::as_str));
        names
    }

    pub(crate) fn with_name_suggestion(&self, diagnostic: Diagnostic, name: &str) -> Diagnostic {
        match suggest::did_you_mean(name, self.known_names()) {
            Some(help) => diagnostic.with_suggestion(help),
            None => diagnostic,
        }
    }
}

pub(crate) enum FlowControl {
    Next,
    NextValue(Value),
    Return(Value),
    Break(SourceSpan),
    Continue(SourceSpan),
}

pub struct Interpreter {
    context: ExecutionContext,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self {
            context: ExecutionContext::new(config),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.context.config
    }

    /// Parse and run `source` against the persistent context. Definitions
    /// survive across calls, which is what the REPL relies on.
    ///
    /// Functions keep the text they were defined in, so a failure inside one
    /// renders against its own line even when a later call triggers it.
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        self.context.steps = 0;
        let text = Rc::new(SourceText::new(self.context.config.script_name.as_str(), source));
        self.context.source = Rc::clone(&text);
        let result =
            parser::parse_program(source).and_then(|program| self.execute_program(&program));

        result.map_err(|diagnostic| {
            let diagnostic = diagnostic.with_source_text(&text);
            self.context.last_error.record(diagnostic.clone());
            LumenError::from(diagnostic)
        })
    }

    /// Parse without executing; syntax problems come back as diagnostics.
    pub fn check_source(&self, source: &str) -> Result<Program> {
        parser::parse_program(source).map_err(|diagnostic| {
            LumenError::from(diagnostic.with_source(&self.context.config.script_name, source))
        })
    }

    pub fn run_file(&mut self, path: &Path) -> Result<Value> {
        let source = read_script(path)?;
        self.context.config.script_name = path.display().to_string();
        self.eval_source(&source)
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.context.warnings
    }

    pub fn last_error(&self) -> Option<Diagnostic> {
        self.context.last_error.get()
    }

    /// Drain captured `print` output; empty when writing to stdout.
    pub fn take_output(&mut self) -> String {
        match &mut self.context.output {
            OutputSink::Buffer(buffer) => std::mem::take(buffer),
            OutputSink::Stdout => String::new(),
        }
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.context.scopes.globals().get(name).cloned()
    }

    pub fn class_mro(&self, name: &str) -> Option<Vec<String>> {
        self.context
            .classes
            .lookup(name)
            .map(|id| self.context.classes.mro_names(id))
    }

    pub fn scope_depth(&self) -> usize {
        self.context.scopes.depth()
    }

    fn execute_program(&mut self, program: &Program) -> Eval<Value> {
        let mut last_value = Value::none();
        for stmt in &program.items {
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

    fn tick(&mut self, span: SourceSpan) -> Eval<()> {
        self.context.steps += 1;
        match self.context.config.max_steps {
            Some(limit) if self.context.steps > limit => Err(Diagnostic::new(
                ErrorCode::E0307,
                format!("step limit of {limit} exceeded"),
            )
            .with_span(span)),
            _ => Ok(()),
        }
    }

    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> Eval<FlowControl> {
        ensure_sufficient_stack(|| self.execute_statement_kind(stmt))
    }

    fn execute_statement_kind(&mut self, stmt: &Stmt) -> Eval<FlowControl> {
        self.tick(stmt.span)?;
        match &stmt.kind {
            StmtKind::Let { name, value } => {
                let value = self.evaluate(value)?;
                self.context.scopes.define(name.as_str(), value);
                Ok(FlowControl::Next)
            }
            StmtKind::Function(decl) => self.define_function(decl),
            StmtKind::Class(decl) => self.define_class(decl, stmt.span),
            StmtKind::Import { module, alias } => self.import_module(module, alias.as_deref(), stmt.span),
            StmtKind::Expr(expr) => Ok(FlowControl::NextValue(self.evaluate(expr)?)),
            StmtKind::Block(items) => self.execute_block(items),
            StmtKind::Conditional {
                style,
                condition,
                then_branch,
                else_branch,
            } => self.execute_conditional(*style, condition, then_branch, else_branch.as_deref()),
            StmtKind::While { condition, body } => self.execute_while(condition, body, stmt.span),
            StmtKind::ForEach {
                binding,
                iterable,
                body,
            } => self.execute_for_each(binding, iterable, body, stmt.span),
            StmtKind::ForRange {
                binding,
                start,
                end,
                step,
                body,
            } => self.execute_for_range(binding, start, end, step.as_ref(), body, stmt.span),
            StmtKind::Repeat { count, body } => self.execute_repeat(count, body, stmt.span),
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::none(),
                };
                Ok(FlowControl::Return(value))
            }
            StmtKind::Break => Ok(FlowControl::Break(stmt.span)),
            StmtKind::Continue => Ok(FlowControl::Continue(stmt.span)),
        }
    }

    /// Blocks share the enclosing frame; only calls push frames.
    fn execute_block(&mut self, statements: &[Stmt]) -> Eval<FlowControl> {
        let mut last_value: Option<Value> = None;
        for stmt in statements {
            match self.execute_statement(stmt)? {
                FlowControl::Next => {}
                FlowControl::NextValue(value) => last_value = Some(value),
                other => return Ok(other),
            }
        }
        Ok(match last_value {
            Some(value) => FlowControl::NextValue(value),
            None => FlowControl::Next,
        })
    }

    fn define_function(&mut self, decl: &FunctionDecl) -> Eval<FlowControl> {
        let def = self.context.functions.define_function(
            &decl.name,
            decl.params.clone(),
            Rc::clone(&decl.body),
            decl.span,
            Rc::clone(&self.context.source),
        );
        trace!(function = %def.name, params = def.params.len(), "defined function");
        Ok(FlowControl::Next)
    }

    fn import_module(
        &mut self,
        module: &str,
        alias: Option<&str>,
        span: SourceSpan,
    ) -> Eval<FlowControl> {
        let Some(value) = stdlib::module(module) else {
            let diagnostic =
                Diagnostic::new(ErrorCode::E0101, format!("module `{module}` not found"))
                    .with_span(span);
            return Err(match suggest::did_you_mean(module, stdlib::MODULES.iter().copied()) {
                Some(help) => diagnostic.with_suggestion(help),
                None => diagnostic,
            });
        };
        let binding = alias.unwrap_or(module);
        debug!(module, binding, "imported module");
        self.context.modules.insert(binding.to_string(), value);
        Ok(FlowControl::Next)
    }

    fn execute_conditional(
        &mut self,
        style: ConditionalStyle,
        condition: &Expr,
        then_branch: &[Stmt],
        else_branch: Option<&[Stmt]>,
    ) -> Eval<FlowControl> {
        let taken = self.evaluate(condition)?.is_truthy();
        trace!(?style, taken, "conditional");
        if taken {
            self.execute_block(then_branch)
        } else if let Some(branch) = else_branch {
            self.execute_block(branch)
        } else {
            Ok(FlowControl::Next)
        }
    }

    /// One loop iteration. `Some` ends the loop with the given flow.
    fn run_iteration(&mut self, body: &[Stmt]) -> Eval<Option<FlowControl>> {
        match self.execute_block(body)? {
            FlowControl::Next | FlowControl::NextValue(_) | FlowControl::Continue(_) => Ok(None),
            FlowControl::Break(_) => Ok(Some(FlowControl::Next)),
            FlowControl::Return(value) => Ok(Some(FlowControl::Return(value))),
        }
    }

    fn execute_while(&mut self, condition: &Expr, body: &[Stmt], span: SourceSpan) -> Eval<FlowControl> {
        while self.evaluate(condition)?.is_truthy() {
            self.tick(span)?;
            if let Some(flow) = self.run_iteration(body)? {
                return Ok(flow);
            }
        }
        Ok(FlowControl::Next)
    }

    /// Runs `run` with `binding` as a loop variable in the innermost frame,
    /// then puts back whatever that frame held before, on every exit path.
    fn with_loop_binding<F>(&mut self, binding: &str, span: SourceSpan, run: F) -> Eval<FlowControl>
    where
        F: FnOnce(&mut Self) -> Eval<FlowControl>,
    {
        let prior = self.context.scopes.local(binding);
        if self.context.scopes.lookup(binding).is_some() {
            self.context.warn(
                Diagnostic::new(
                    ErrorCode::W0001,
                    format!("loop variable `{binding}` shadows an existing binding"),
                )
                .with_span(span),
            );
        }
        let result = run(self);
        match prior {
            Some(value) => self.context.scopes.define(binding, value),
            None => self.context.scopes.remove_local(binding),
        }
        result
    }

    fn execute_for_each(
        &mut self,
        binding: &str,
        iterable: &Expr,
        body: &[Stmt],
        span: SourceSpan,
    ) -> Eval<FlowControl> {
        let subject = self.evaluate(iterable)?;
        let items = match subject.kind() {
            ValueKind::List(items) => items.borrow().clone(),
            _ => vec![subject.clone()],
        };
        self.with_loop_binding(binding, span, |this| {
            for item in items {
                this.context.scopes.define(binding, item);
                if let Some(flow) = this.run_iteration(body)? {
                    return Ok(flow);
                }
            }
            Ok(FlowControl::Next)
        })
    }

    fn execute_for_range(
        &mut self,
        binding: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &[Stmt],
        span: SourceSpan,
    ) -> Eval<FlowControl> {
        let first = self.evaluate_int(start, "range start")?;
        let last = self.evaluate_int(end, "range end")?;
        let step = match step {
            Some(expr) => {
                let step = self.evaluate_int(expr, "range step")?;
                if step == 0 {
                    return Err(Diagnostic::new(ErrorCode::E0503, "range step cannot be zero")
                        .with_span(expr.span));
                }
                step
            }
            None => 1,
        };
        self.with_loop_binding(binding, span, |this| {
            let mut current = first;
            while (step > 0 && current <= last) || (step < 0 && current >= last) {
                this.context.scopes.define(binding, Value::int(current));
                if let Some(flow) = this.run_iteration(body)? {
                    return Ok(flow);
                }
                current = match current.checked_add(step) {
                    Some(next) => next,
                    None => break,
                };
            }
            Ok(FlowControl::Next)
        })
    }

    fn execute_repeat(&mut self, count: &Expr, body: &[Stmt], span: SourceSpan) -> Eval<FlowControl> {
        let times = self.evaluate_int(count, "repeat count")?;
        for _ in 0..times.max(0) {
            self.tick(span)?;
            if let Some(flow) = self.run_iteration(body)? {
                return Ok(flow);
            }
        }
        Ok(FlowControl::Next)
    }

    fn evaluate_int(&mut self, expr: &Expr, what: &str) -> Eval<i64> {
        let value = self.evaluate(expr)?;
        value.as_int().ok_or_else(|| {
            Diagnostic::new(
                ErrorCode::E0201,
                format!("{what} must be Int, found {}", value.type_name()),
            )
            .with_span(expr.span)
        })
    }

    pub(crate) fn evaluate(&mut self, expr: &Expr) -> Eval<Value> {
        ensure_sufficient_stack(|| self.evaluate_kind(expr))
    }

    fn evaluate_kind(&mut self, expr: &Expr) -> Eval<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => literal_value(literal, expr.span),
            ExprKind::Variable(name) => self.context.resolve(name, expr.span),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, expr.span),
            ExprKind::Unary { op, expr: operand } => {
                let value = self.evaluate(operand)?;
                operators::unary(*op, &value, expr.span)
            }
            ExprKind::Assign { target, value } => self.eval_assign(target, value),
            ExprKind::Call { callee, args } => self.eval_call(callee, args, expr.span),
            ExprKind::ListLiteral(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::list(values))
            }
            ExprKind::DictLiteral(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key_expr, value_expr) in entries {
                    let key = self.evaluate(key_expr)?;
                    let key = members::dict_key(&key, key_expr.span)?;
                    let value = self.evaluate(value_expr)?;
                    map.insert(key, value);
                }
                Ok(Value::dict(map))
            }
            ExprKind::Group(inner) => self.evaluate(inner),
            ExprKind::Index { target, index } => {
                let target = self.evaluate(target)?;
                let index = self.evaluate(index)?;
                members::index_value(&target, &index, expr.span)
            }
            ExprKind::Field { target, field } => {
                let target = self.evaluate(target)?;
                self.get_attribute(&target, field, expr.span)
            }
            ExprKind::Super => self.eval_super(expr.span),
        }
    }

    fn eval_assign(&mut self, target: &Expr, value: &Expr) -> Eval<Value> {
        match &target.kind {
            ExprKind::Variable(name) => {
                let value = self.evaluate(value)?;
                self.context.scopes.assign(name, value.clone());
                Ok(value)
            }
            ExprKind::Index {
                target: owner,
                index,
            } => {
                let owner = self.evaluate(owner)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                members::set_index(&owner, &index, value.clone(), target.span)?;
                Ok(value)
            }
            ExprKind::Field {
                target: owner,
                field,
            } => {
                let owner = self.evaluate(owner)?;
                let value = self.evaluate(value)?;
                self.set_attribute(&owner, field, value.clone(), target.span)?;
                Ok(value)
            }
            _ => Err(
                Diagnostic::new(ErrorCode::E0005, "invalid assignment target").with_span(target.span),
            ),
        }
    }
}

fn literal_value(literal: &Literal, span: SourceSpan) -> Eval<Value> {
    match literal {
        Literal::Number(lexeme) => {
            let digits = lexeme.replace('_', "");
            let parsed = if digits.contains('.') {
                digits.parse::<f64>().ok().map(Value::float)
            } else {
                digits.parse::<i64>().ok().map(Value::int)
            };
            parsed.ok_or_else(|| {
                Diagnostic::new(ErrorCode::E0003, format!("invalid number literal `{lexeme}`"))
                    .with_span(span)
            })
        }
        Literal::Bool(value) => Ok(Value::bool(*value)),
        Literal::String(text) => Ok(Value::string(text.clone())),
        Literal::None => Ok(Value::none()),
    }
}

fn loop_control_outside(keyword: &str, span: SourceSpan) -> Diagnostic {
    Diagnostic::new(ErrorCode::E0305, format!("`{keyword}` outside of a loop")).with_span(span)
}

fn read_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|err| {
        let code = if err.kind() == io::ErrorKind::NotFound {
            ErrorCode::E0601
        } else {
            ErrorCode::E0602
        };
        LumenError::from(Diagnostic::new(
            code,
            format!("cannot read `{}`: {err}", path.display()),
        ))
    })
}
