// Tree-walking interpreter for the traced script language.
//
// Every function invocation runs in an `Activation` holding its scope frame,
// receiver, `arguments` array and, while a trace replay is in progress, the
// session that injected probes report to.

use std::{cmp::Ordering, rc::Rc};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::{
    ast::{AssignOp, BinaryOp, Expr, ExprKind, Span, Stmt, StmtKind, UnaryOp, UpdateOp},
    parser::{line_column, parse_program},
    tracer::{engine::TraceSession, sink::LogSink},
    TraceConfig, CALL_DEPTH_LIMIT,
};

pub mod builtins;
pub mod errors;
pub mod scope;
pub mod value;

pub use errors::{ErrorKind, EvalError};
pub use scope::{Frame, FrameKind, Slot};
pub use value::{format_number, Closure, Native, NativeCall, NativeFn, Value};


/// Remaining native stack below which a call switches to a new segment
const STACK_RED_ZONE: usize = 256 * 1024;
/// Size of each additional stack segment
const STACK_SEGMENT: usize = 4 * 1024 * 1024;
/// Arrays never grow past this many elements through index or length writes
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

/// Control flow result for handling break/continue/return
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    None(Value),
    Break(Span),
    Continue(Span),
    Return(Value),
}

/// Execution context of one function invocation
#[derive(Clone)]
pub struct Activation {
    pub frame: Rc<Frame>,
    pub this: Value,
    /// The `arguments` array. A replay shares it with the call being traced.
    pub arguments: Value,
    pub callee: Option<Rc<Closure>>,
    /// Source text that spans of the running code refer to
    pub source: Rc<str>,
    pub session: Option<Rc<TraceSession>>,
}

/// Assignable location
enum Place {
    Slot(Slot),
    Property(Value, String),
}

pub struct Interpreter {
    globals: Rc<Frame>,
    stack: Vec<Activation>,
    sink: Option<Rc<dyn LogSink>>,
    config: TraceConfig,
}

impl Interpreter {
    pub fn new(mut config: TraceConfig) -> Self {
        if config.max_call_depth > CALL_DEPTH_LIMIT {
            warn!(
                "max_call_depth {} exceeds {}; clamping",
                config.max_call_depth, CALL_DEPTH_LIMIT
            );
            config.max_call_depth = CALL_DEPTH_LIMIT;
        }
        let globals = Frame::global();
        builtins::install(&globals, &config);
        Self {
            globals,
            stack: Vec::new(),
            sink: None,
            config,
        }
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Toggle logging of instrumented listings before each replay
    pub fn set_dump_instrumented(&mut self, dump: bool) {
        self.config.dump_instrumented = dump;
    }

    pub fn set_sink(&mut self, sink: Rc<dyn LogSink>) {
        self.sink = Some(sink);
    }

    pub fn sink(&self) -> Option<Rc<dyn LogSink>> {
        self.sink.clone()
    }

    pub fn globals(&self) -> &Rc<Frame> {
        &self.globals
    }

    pub fn current_activation(&self) -> Option<&Activation> {
        self.stack.last()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Parse and run a program in the global scope, returning the value of
    /// the last statement
    pub fn eval_source(&mut self, source: &str) -> Result<Value, EvalError> {
        let program = parse_program(source)?;
        debug!("Evaluating program with {} statements", program.len());
        let activation = Activation {
            frame: Rc::clone(&self.globals),
            this: Value::Undefined,
            arguments: Value::Undefined,
            callee: None,
            source: Rc::from(source),
            session: None,
        };
        match self.enter(activation, &program, Span::default())? {
            ControlFlow::None(value) | ControlFlow::Return(value) => Ok(value),
            ControlFlow::Break(_) | ControlFlow::Continue(_) => Ok(Value::Undefined),
        }
    }

    /// Call a function value from host code
    pub fn call_function(&mut self, function: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
        self.call_value(function, Value::Undefined, args, Span::default())
    }

    /// Call a global function by name
    pub fn call_global(&mut self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let function = self.globals.get(name).ok_or_else(|| {
            EvalError::runtime(ErrorKind::ReferenceError, format!("{name} is not defined"), 0, 0)
        })?;
        self.call_function(&function, args)
    }

    /// Evaluate an expression in the scope of the running activation
    pub fn eval_expression(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.eval_expr(expr)
    }

    /// Run `body` as a function body in `activation` and return its result
    pub fn run_activation(
        &mut self,
        activation: Activation,
        body: &[Stmt],
        call_span: Span,
    ) -> Result<Value, EvalError> {
        match self.enter(activation, body, call_span)? {
            ControlFlow::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }

    fn enter(
        &mut self,
        activation: Activation,
        body: &[Stmt],
        call_span: Span,
    ) -> Result<ControlFlow, EvalError> {
        // Script recursion is native recursion; move to a fresh stack segment
        // before the thread's own stack runs out
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.enter_on_stack(activation, body, call_span)
        })
    }

    fn enter_on_stack(
        &mut self,
        activation: Activation,
        body: &[Stmt],
        call_span: Span,
    ) -> Result<ControlFlow, EvalError> {
        if self.stack.len() >= self.config.max_call_depth {
            return Err(self.error_at(
                call_span,
                ErrorKind::RangeError,
                "Maximum call stack size exceeded",
            ));
        }
        hoist_declarations(&activation.frame, &activation.source, body);
        self.stack.push(activation);
        let result = self.exec_block(body);
        let result = match result {
            Ok(ControlFlow::Break(span)) => {
                Err(self.error_at(span, ErrorKind::SyntaxError, "break outside of a loop"))
            }
            Ok(ControlFlow::Continue(span)) => {
                Err(self.error_at(span, ErrorKind::SyntaxError, "continue outside of a loop"))
            }
            other => other,
        };
        self.stack.pop();
        result
    }

    pub fn call_value(
        &mut self,
        function: &Value,
        this: Value,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, EvalError> {
        match function {
            Value::Function(closure) => self.call_closure(Rc::clone(closure), this, args, span),
            Value::Native(native) => (native.func)(self, NativeCall { this, args, span }),
            other => Err(self.error_at(
                span,
                ErrorKind::TypeError,
                format!("{} is not a function", other.type_name()),
            )),
        }
    }

    fn call_closure(
        &mut self,
        closure: Rc<Closure>,
        this: Value,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, EvalError> {
        trace!(
            "Calling {} with {} arguments",
            closure.name().unwrap_or("anonymous"),
            args.len()
        );
        let frame = Frame::function(Rc::clone(&closure.scope));
        for (i, param) in closure.decl.params.iter().enumerate() {
            frame.declare(param, args.get(i).cloned().unwrap_or_default());
        }
        let activation = Activation {
            frame,
            this,
            arguments: Value::array(args),
            callee: Some(Rc::clone(&closure)),
            source: Rc::clone(&closure.source),
            session: None,
        };
        self.run_activation(activation, &closure.decl.body, span)
    }

    fn frame(&self) -> Rc<Frame> {
        self.stack
            .last()
            .map(|activation| Rc::clone(&activation.frame))
            .unwrap_or_else(|| Rc::clone(&self.globals))
    }

    fn source(&self) -> Rc<str> {
        self.stack
            .last()
            .map(|activation| Rc::clone(&activation.source))
            .unwrap_or_else(|| Rc::from(""))
    }

    /// Runtime error positioned at `span` in the running source
    fn error_at(&self, span: Span, kind: ErrorKind, message: impl Into<String>) -> EvalError {
        let (line, column) = match self.stack.last() {
            Some(activation) => line_column(&activation.source, span.start),
            None => (0, 0),
        };
        EvalError::runtime(kind, message, line, column)
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<ControlFlow, EvalError> {
        let mut last = Value::Undefined;
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                ControlFlow::None(value) => last = value,
                flow => return Ok(flow),
            }
        }
        Ok(ControlFlow::None(last))
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<ControlFlow, EvalError> {
        match &stmt.kind {
            StmtKind::VarDecl { declarations, .. } => {
                let frame = self.frame();
                for (name, init) in declarations {
                    match init {
                        Some(init) => {
                            let value = self.eval_expr(init)?;
                            frame.declare(name, value);
                        }
                        None => frame.declare_hoisted(name),
                    }
                }
                Ok(ControlFlow::None(Value::Undefined))
            }
            StmtKind::Expression(expr) => Ok(ControlFlow::None(self.eval_expr(expr)?)),
            StmtKind::Function(decl) => {
                if let Some(name) = &decl.name {
                    let closure = Value::Function(Rc::new(Closure {
                        decl: Rc::clone(decl),
                        scope: self.frame(),
                        source: self.source(),
                    }));
                    self.frame().declare(name, closure);
                }
                Ok(ControlFlow::None(Value::Undefined))
            }
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Undefined,
                };
                Ok(ControlFlow::Return(value))
            }
            StmtKind::Break => Ok(ControlFlow::Break(stmt.span)),
            StmtKind::Continue => Ok(ControlFlow::Continue(stmt.span)),
            StmtKind::Throw(expr) => {
                let value = self.eval_expr(expr)?;
                Err(EvalError::Thrown {
                    message: value.to_string(),
                })
            }
            StmtKind::Block(stmts) => self.exec_block(stmts),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.eval_expr(condition)?.truthy() {
                    self.exec_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(ControlFlow::None(Value::Undefined))
                }
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.exec_stmt(init)?;
                }
                loop {
                    if let Some(condition) = condition {
                        if !self.eval_expr(condition)?.truthy() {
                            break;
                        }
                    }
                    match self.exec_stmt(body)? {
                        ControlFlow::Break(_) => break,
                        ControlFlow::Return(value) => return Ok(ControlFlow::Return(value)),
                        ControlFlow::None(_) | ControlFlow::Continue(_) => {}
                    }
                    if let Some(update) = update {
                        self.eval_expr(update)?;
                    }
                }
                Ok(ControlFlow::None(Value::Undefined))
            }
            StmtKind::While {
                condition, body, ..
            } => {
                while self.eval_expr(condition)?.truthy() {
                    match self.exec_stmt(body)? {
                        ControlFlow::Break(_) => break,
                        ControlFlow::Return(value) => return Ok(ControlFlow::Return(value)),
                        ControlFlow::None(_) | ControlFlow::Continue(_) => {}
                    }
                }
                Ok(ControlFlow::None(Value::Undefined))
            }
            StmtKind::DoWhile {
                body, condition, ..
            } => {
                loop {
                    match self.exec_stmt(body)? {
                        ControlFlow::Break(_) => break,
                        ControlFlow::Return(value) => return Ok(ControlFlow::Return(value)),
                        ControlFlow::None(_) | ControlFlow::Continue(_) => {}
                    }
                    if !self.eval_expr(condition)?.truthy() {
                        break;
                    }
                }
                Ok(ControlFlow::None(Value::Undefined))
            }
            StmtKind::Empty => Ok(ControlFlow::None(Value::Undefined)),
            StmtKind::Probe { text } => {
                let session = self
                    .stack
                    .last()
                    .and_then(|activation| activation.session.clone());
                if let Some(session) = session {
                    session.fire(self, text);
                }
                Ok(ControlFlow::None(Value::Undefined))
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::String(s) => Ok(Value::Str(s.clone())),
            ExprKind::Boolean(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Undefined => Ok(Value::Undefined),
            ExprKind::Identifier(name) => self.eval_identifier(name, expr.span),
            ExprKind::This => Ok(self
                .stack
                .last()
                .map(|activation| activation.this.clone())
                .unwrap_or_default()),
            ExprKind::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval_expr(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::array(values))
            }
            ExprKind::Object(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    let value = self.eval_expr(value)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::object(map))
            }
            ExprKind::Function(decl) => Ok(Value::Function(Rc::new(Closure {
                decl: Rc::clone(decl),
                scope: self.frame(),
                source: self.source(),
            }))),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::Binary { op, left, right } => {
                let left = self.eval_expr(left)?;
                match op {
                    BinaryOp::And if !left.truthy() => Ok(left),
                    BinaryOp::Or if left.truthy() => Ok(left),
                    BinaryOp::And | BinaryOp::Or => self.eval_expr(right),
                    _ => {
                        let right = self.eval_expr(right)?;
                        Ok(binary_value(*op, left, right))
                    }
                }
            }
            ExprKind::Assign { op, target, value } => self.eval_assign(*op, target, value),
            ExprKind::Update { op, prefix, target } => {
                let place = self.resolve_place(target)?;
                let old = self.read_place(&place, target.span)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.write_place(&place, Value::Number(new), target.span)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.eval_expr(condition)?.truthy() {
                    self.eval_expr(then_expr)
                } else {
                    self.eval_expr(else_expr)
                }
            }
            ExprKind::Call { callee, args } => self.eval_call(expr, callee, args),
            ExprKind::Member { object, property } => {
                let object = self.eval_expr(object)?;
                self.get_property(&object, property, expr.span)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval_expr(object)?;
                let key = property_key(&self.eval_expr(index)?);
                self.get_property(&object, &key, expr.span)
            }
        }
    }

    fn eval_identifier(&self, name: &str, span: Span) -> Result<Value, EvalError> {
        if let Some(value) = self.frame().get(name) {
            return Ok(value);
        }
        if name == "arguments" {
            if let Some(activation) = self.stack.last().filter(|a| a.callee.is_some()) {
                return Ok(activation.arguments.clone());
            }
        }
        Err(self.error_at(
            span,
            ErrorKind::ReferenceError,
            format!("{name} is not defined"),
        ))
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value, EvalError> {
        if op == UnaryOp::TypeOf {
            let value = match self.eval_expr(operand) {
                Ok(value) => value,
                Err(EvalError::Runtime {
                    kind: ErrorKind::ReferenceError,
                    ..
                }) if matches!(operand.kind, ExprKind::Identifier(_)) => Value::Undefined,
                Err(e) => return Err(e),
            };
            return Ok(Value::from(value.type_name()));
        }
        let value = self.eval_expr(operand)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.truthy()),
            UnaryOp::Negate => Value::Number(-value.to_number()),
            UnaryOp::Plus | UnaryOp::TypeOf => Value::Number(value.to_number()),
        })
    }

    fn eval_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr) -> Result<Value, EvalError> {
        let place = self.resolve_place(target)?;
        let new = match op.binary() {
            None => self.eval_expr(value)?,
            Some(bin) => {
                let current = self.read_place(&place, target.span)?;
                let rhs = self.eval_expr(value)?;
                binary_value(bin, current, rhs)
            }
        };
        self.write_place(&place, new.clone(), target.span)?;
        Ok(new)
    }

    fn eval_call(&mut self, call: &Expr, callee: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        let (function, this) = match &callee.kind {
            ExprKind::Member { object, property } => {
                let object = self.eval_expr(object)?;
                let function = self.get_property(&object, property, callee.span)?;
                (function, object)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval_expr(object)?;
                let key = property_key(&self.eval_expr(index)?);
                let function = self.get_property(&object, &key, callee.span)?;
                (function, object)
            }
            _ => (self.eval_expr(callee)?, Value::Undefined),
        };
        let args = args
            .iter()
            .map(|arg| self.eval_expr(arg))
            .collect::<Result<Vec<_>, _>>()?;
        if !function.is_callable() {
            let source = self.source();
            return Err(self.error_at(
                call.span,
                ErrorKind::TypeError,
                format!("{} is not a function", callee.span.slice(&source)),
            ));
        }
        self.call_value(&function, this, args, call.span)
    }

    fn resolve_place(&mut self, target: &Expr) -> Result<Place, EvalError> {
        match &target.kind {
            ExprKind::Identifier(name) => self.frame().lookup(name).map(Place::Slot).ok_or_else(|| {
                self.error_at(
                    target.span,
                    ErrorKind::ReferenceError,
                    format!("{name} is not defined"),
                )
            }),
            ExprKind::Member { object, property } => {
                Ok(Place::Property(self.eval_expr(object)?, property.clone()))
            }
            ExprKind::Index { object, index } => {
                let object = self.eval_expr(object)?;
                let key = property_key(&self.eval_expr(index)?);
                Ok(Place::Property(object, key))
            }
            _ => Err(self.error_at(
                target.span,
                ErrorKind::SyntaxError,
                "invalid assignment target",
            )),
        }
    }

    fn read_place(&self, place: &Place, span: Span) -> Result<Value, EvalError> {
        match place {
            Place::Slot(slot) => Ok(slot.borrow().clone()),
            Place::Property(object, key) => self.get_property(object, key, span),
        }
    }

    fn write_place(&self, place: &Place, value: Value, span: Span) -> Result<(), EvalError> {
        match place {
            Place::Slot(slot) => {
                *slot.borrow_mut() = value;
                Ok(())
            }
            Place::Property(object, key) => self.set_property(object, key, value, span),
        }
    }

    fn get_property(&self, object: &Value, name: &str, span: Span) -> Result<Value, EvalError> {
        Ok(match object {
            Value::Undefined | Value::Null => {
                return Err(self.error_at(
                    span,
                    ErrorKind::TypeError,
                    format!("Cannot read property '{name}' of {object}"),
                ))
            }
            Value::Array(items) => match name {
                "length" => Value::Number(items.borrow().len() as f64),
                "push" => Value::native("push", builtins::array_push),
                "pop" => Value::native("pop", builtins::array_pop),
                "join" => Value::native("join", builtins::array_join),
                "indexOf" => Value::native("indexOf", builtins::array_index_of),
                _ => name
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.borrow().get(i).cloned())
                    .unwrap_or_default(),
            },
            Value::Str(s) => match name {
                "length" => Value::Number(s.chars().count() as f64),
                _ => name
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or_default(),
            },
            Value::Object(entries) => entries.borrow().get(name).cloned().unwrap_or_default(),
            Value::Function(closure) => match name {
                "name" => Value::from(closure.name().unwrap_or("")),
                "length" => Value::Number(closure.decl.params.len() as f64),
                _ => Value::Undefined,
            },
            Value::Native(native) => match name {
                "name" => Value::from(native.name),
                _ => Value::Undefined,
            },
            Value::Bool(_) | Value::Number(_) => Value::Undefined,
        })
    }

    fn set_property(&self, object: &Value, name: &str, value: Value, span: Span) -> Result<(), EvalError> {
        match object {
            Value::Undefined | Value::Null => Err(self.error_at(
                span,
                ErrorKind::TypeError,
                format!("Cannot set property '{name}' of {object}"),
            )),
            Value::Array(items) => {
                let mut items = items.borrow_mut();
                if name == "length" {
                    let len = value.to_number();
                    if len < 0.0 || len.fract() != 0.0 || len > MAX_ARRAY_LENGTH as f64 {
                        return Err(self.error_at(span, ErrorKind::RangeError, "Invalid array length"));
                    }
                    items.resize(len as usize, Value::Undefined);
                } else if let Ok(index) = name.parse::<usize>() {
                    if index >= items.len() {
                        if index >= MAX_ARRAY_LENGTH {
                            return Err(self.error_at(
                                span,
                                ErrorKind::RangeError,
                                format!("Array index {index} is out of range"),
                            ));
                        }
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                }
                Ok(())
            }
            Value::Object(entries) => {
                entries.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            // Properties on primitives and functions are silently dropped
            _ => Ok(()),
        }
    }
}

/// Declare the names a function body binds before running it: `var`-style
/// names start as `undefined`, top-level function declarations are created
/// up front. Nested function bodies are not searched.
fn hoist_declarations(frame: &Rc<Frame>, source: &Rc<str>, body: &[Stmt]) {
    for stmt in body {
        if let StmtKind::Function(decl) = &stmt.kind {
            if let Some(name) = &decl.name {
                let closure = Closure {
                    decl: Rc::clone(decl),
                    scope: Rc::clone(frame),
                    source: Rc::clone(source),
                };
                frame.declare(name, Value::Function(Rc::new(closure)));
            }
        } else {
            hoist_variables(frame, stmt);
        }
    }
}

fn hoist_variables(frame: &Frame, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::VarDecl { declarations, .. } => {
            for (name, _) in declarations {
                frame.declare_hoisted(name);
            }
        }
        StmtKind::Block(stmts) => stmts.iter().for_each(|s| hoist_variables(frame, s)),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            hoist_variables(frame, then_branch);
            if let Some(else_branch) = else_branch {
                hoist_variables(frame, else_branch);
            }
        }
        StmtKind::For { init, body, .. } => {
            if let Some(init) = init {
                hoist_variables(frame, init);
            }
            hoist_variables(frame, body);
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
            hoist_variables(frame, body)
        }
        _ => {}
    }
}

/// Key used for `object[index]`
fn property_key(index: &Value) -> String {
    match index {
        Value::Number(n) => format_number(*n),
        other => other.to_string(),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

/// Apply a non-short-circuiting binary operator to evaluated operands
fn binary_value(op: BinaryOp, left: Value, right: Value) -> Value {
    match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::Str(_) | Value::Array(_) | Value::Object(_), _)
            | (_, Value::Str(_) | Value::Array(_) | Value::Object(_)) => {
                Value::Str(format!("{left}{right}"))
            }
            _ => Value::Number(left.to_number() + right.to_number()),
        },
        BinaryOp::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Modulo => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Equal => Value::Bool(left.loose_equals(&right)),
        BinaryOp::NotEqual => Value::Bool(!left.loose_equals(&right)),
        BinaryOp::StrictEqual => Value::Bool(left.strict_equals(&right)),
        BinaryOp::StrictNotEqual => Value::Bool(!left.strict_equals(&right)),
        BinaryOp::LessThan => Value::Bool(compare(&left, &right) == Some(Ordering::Less)),
        BinaryOp::LessEqual => Value::Bool(matches!(
            compare(&left, &right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::GreaterThan => Value::Bool(compare(&left, &right) == Some(Ordering::Greater)),
        BinaryOp::GreaterEqual => Value::Bool(matches!(
            compare(&left, &right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::And => {
            if left.truthy() {
                right
            } else {
                left
            }
        }
        BinaryOp::Or => {
            if left.truthy() {
                left
            } else {
                right
            }
        }
    }
}
