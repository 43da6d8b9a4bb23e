//! Tree-walking interpreter.
//!
//! Execution keeps an explicit stack of [`Frame`]s and pins the active
//! frame's line as it moves: to the statement on entry, to an attribute
//! expression before the lookup runs, and to a call expression before the
//! callee runs. Dispatchers read that position to find the source text
//! that invoked them, so the pinning rules are part of the language
//! contract, not a diagnostic nicety.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{
    AssignTarget, BinaryOperator, Comprehension, Expression, ExpressionKind, Statement,
    StatementKind,
};
use crate::dispatch::Engine;
use crate::frame::{CodeId, StackFrame, resolve_name};
use crate::runtime::activation::{Frame, FunctionDef, FunctionRegistry};
use crate::runtime::builtins::{BuiltinFunction, call_builtin};
use crate::runtime::error::RuntimeError;
use crate::runtime::object::CallContext;
use crate::runtime::value::Value;
use crate::source::document::SourceDocument;

/// Control-flow marker threaded out of statement execution.
enum ExecResult {
    Continue,
    Return(Value),
}

pub struct Interpreter {
    engine: Rc<Engine>,
    registry: FunctionRegistry,
    frames: Vec<Rc<Frame>>,
    globals: Rc<RefCell<FxHashMap<String, Value>>>,
    builtins: Rc<RefCell<FxHashMap<String, Value>>>,
    output: Vec<String>,
}

impl Interpreter {
    pub fn new(engine: Rc<Engine>) -> Interpreter {
        let builtins: FxHashMap<String, Value> = BuiltinFunction::all()
            .into_iter()
            .map(|builtin| (builtin.name().to_string(), Value::Builtin(builtin)))
            .collect();
        Interpreter {
            engine,
            registry: FunctionRegistry::new(),
            frames: Vec::new(),
            globals: Rc::new(RefCell::new(FxHashMap::default())),
            builtins: Rc::new(RefCell::new(builtins)),
            output: Vec::new(),
        }
    }

    pub fn engine(&self) -> &Rc<Engine> {
        &self.engine
    }

    pub fn registry_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.registry
    }

    pub fn define_builtin(&mut self, name: impl Into<String>, value: Value) {
        self.builtins.borrow_mut().insert(name.into(), value);
    }

    pub fn define_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.borrow_mut().insert(name.into(), value);
    }

    /// Runs the file at `path`, returning everything it printed.
    pub fn run_path(&mut self, path: &Path) -> anyhow::Result<String> {
        let document = self.engine.document(path).map_err(RuntimeError::from)?;
        self.run_document(&document)
    }

    /// Runs in-memory source registered under `path`, so call-site
    /// resolution sees the same text the interpreter executes.
    pub fn run_source(
        &mut self,
        path: impl Into<PathBuf>,
        source: &str,
    ) -> anyhow::Result<String> {
        let document = SourceDocument::from_source(path, source).map_err(RuntimeError::from)?;
        let document = self.engine.register_document(document);
        self.run_document(&document)
    }

    fn run_document(&mut self, document: &Rc<SourceDocument>) -> anyhow::Result<String> {
        let path = Rc::new(document.path().to_path_buf());
        let frame = Rc::new(Frame::module(
            path,
            self.globals.clone(),
            self.builtins.clone(),
        ));
        self.frames.push(frame);
        let result = self.exec_block(&document.program().statements);
        self.frames.pop();
        match result? {
            ExecResult::Continue => Ok(self.output.join("\n")),
            ExecResult::Return(_) => Err(RuntimeError::ReturnOutsideFunction.into()),
        }
    }

    fn exec_block(&mut self, statements: &[Statement]) -> Result<ExecResult, RuntimeError> {
        for statement in statements {
            if let ExecResult::Return(value) = self.exec_statement(statement)? {
                return Ok(ExecResult::Return(value));
            }
        }
        Ok(ExecResult::Continue)
    }

    fn exec_statement(&mut self, statement: &Statement) -> Result<ExecResult, RuntimeError> {
        self.active_frame().set_line(statement.span.line);
        match &statement.kind {
            StatementKind::FunctionDef { name, params, body } => {
                if self.active_frame().has_locals() {
                    return Err(RuntimeError::NestedFunctionDefinitionsUnsupported);
                }
                let code = self.registry.register_function(FunctionDef {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone().into(),
                });
                self.active_frame().store(
                    name.clone(),
                    Value::Function {
                        name: Rc::from(name.as_str()),
                        code,
                    },
                );
                Ok(ExecResult::Continue)
            }
            StatementKind::Assign { target, value } => {
                let value = self.eval_expression(value)?;
                self.assign_target(target, value)?;
                Ok(ExecResult::Continue)
            }
            StatementKind::While { condition, body } => {
                loop {
                    // The condition re-runs at the header line, however far
                    // the body moved the frame.
                    self.active_frame().set_line(statement.span.line);
                    if !self.eval_expression(condition)?.is_truthy() {
                        break;
                    }
                    if let ExecResult::Return(value) = self.exec_block(body)? {
                        return Ok(ExecResult::Return(value));
                    }
                }
                Ok(ExecResult::Continue)
            }
            StatementKind::For {
                target,
                iterable,
                body,
            } => {
                let items = {
                    let value = self.eval_expression(iterable)?;
                    self.iterable_values(&value)?
                };
                for item in items {
                    self.active_frame().set_line(statement.span.line);
                    self.assign_target(target, item)?;
                    if let ExecResult::Return(value) = self.exec_block(body)? {
                        return Ok(ExecResult::Return(value));
                    }
                }
                Ok(ExecResult::Continue)
            }
            StatementKind::If {
                condition,
                then_body,
                else_body,
            } => {
                if self.eval_expression(condition)?.is_truthy() {
                    self.exec_block(then_body)
                } else {
                    self.exec_block(else_body)
                }
            }
            StatementKind::Return(value) => {
                let value = match value {
                    Some(expression) => self.eval_expression(expression)?,
                    None => Value::None,
                };
                Ok(ExecResult::Return(value))
            }
            StatementKind::Pass => Ok(ExecResult::Continue),
            StatementKind::Expr(expression) => {
                self.eval_expression(expression)?;
                Ok(ExecResult::Continue)
            }
        }
    }

    fn eval_expression(&mut self, expression: &Expression) -> Result<Value, RuntimeError> {
        match &expression.kind {
            ExpressionKind::Integer(value) => Ok(Value::Integer(*value)),
            ExpressionKind::Boolean(value) => Ok(Value::Boolean(*value)),
            ExpressionKind::String(text) => Ok(Value::string(text.as_str())),
            ExpressionKind::NoneLiteral => Ok(Value::None),
            ExpressionKind::Identifier(name) => {
                resolve_name(self.active_frame().as_ref(), name)
                    .map_err(|_| RuntimeError::UndefinedVariable { name: name.clone() })
            }
            ExpressionKind::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expression(item)?);
                }
                Ok(Value::list(values))
            }
            ExpressionKind::ListComp { element, clause } => {
                self.eval_comprehension(element, clause)
            }
            ExpressionKind::Index { object, index } => {
                let object = self.eval_expression(object)?;
                let index = self.eval_expression(index)?.as_integer()?;
                match &object {
                    Value::Object(target) => target.borrow().index_get(index),
                    other => Err(RuntimeError::ExpectedListType {
                        got: other.type_name().to_string(),
                    }),
                }
            }
            ExpressionKind::Attribute { object, name } => {
                let value = self.eval_expression(object)?;
                // Pin to the access expression before the lookup runs; a
                // namespace member resolves its call site against this line.
                self.active_frame().set_line(expression.span.line);
                match &value {
                    Value::Object(object) => {
                        let result = object.borrow().get_attribute(object, self, name);
                        result
                    }
                    other => Err(RuntimeError::UnknownAttribute {
                        attribute: name.clone(),
                        type_name: other.type_name().to_string(),
                    }),
                }
            }
            ExpressionKind::BinaryOp { left, op, right } => {
                let left = self.eval_expression(left)?;
                let right = self.eval_expression(right)?;
                match op {
                    BinaryOperator::Add => left.add(&right),
                    BinaryOperator::Sub => left.sub(&right),
                    BinaryOperator::LessThan => left.lt(&right),
                }
            }
            ExpressionKind::Call { callee, args } => self.eval_call(expression, callee, args),
        }
    }

    fn eval_call(
        &mut self,
        expression: &Expression,
        callee: &Expression,
        args: &[Expression],
    ) -> Result<Value, RuntimeError> {
        let callee = self.eval_expression(callee)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expression(arg)?);
        }
        // Pin to the call expression itself: a dispatcher invoked here
        // searches this line for the call that named it.
        self.active_frame().set_line(expression.span.line);
        self.call_value(callee, values)
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Builtin(builtin) => call_builtin(builtin, self, args),
            Value::Function { name, code } => self.call_function(&name, code, args),
            Value::Object(object) => {
                let result = object.borrow().call(&object, self, args);
                result
            }
            other => Err(RuntimeError::ObjectNotCallable {
                type_name: other.type_name().to_string(),
            }),
        }
    }

    fn call_function(
        &mut self,
        name: &str,
        code: CodeId,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let function = match self.registry.function(code) {
            Some(function) => function.clone(),
            None => {
                return Err(RuntimeError::ObjectNotCallable {
                    type_name: "native code".to_string(),
                });
            }
        };
        RuntimeError::expect_function_arity(name, function.params.len(), args.len())?;
        let locals: FxHashMap<String, Value> =
            function.params.iter().cloned().zip(args).collect();
        let path = self.active_frame().source_path().clone();
        let frame = Rc::new(Frame::function(
            code,
            path,
            locals,
            self.globals.clone(),
            self.builtins.clone(),
        ));
        self.frames.push(frame);
        let result = self.exec_block(&function.body);
        self.frames.pop();
        match result? {
            ExecResult::Continue => Ok(Value::None),
            ExecResult::Return(value) => Ok(value),
        }
    }

    fn assign_target(&mut self, target: &AssignTarget, value: Value) -> Result<(), RuntimeError> {
        match target {
            AssignTarget::Name(name) => {
                self.active_frame().store(name.clone(), value);
                Ok(())
            }
            AssignTarget::Tuple(targets) => {
                let values = self.iterable_values(&value)?;
                if values.len() != targets.len() {
                    return Err(RuntimeError::UnpackMismatch {
                        expected: targets.len(),
                        found: values.len(),
                    });
                }
                for (target, value) in targets.iter().zip(values) {
                    self.assign_target(target, value)?;
                }
                Ok(())
            }
            AssignTarget::Attribute { object, name } => {
                let object = self.eval_expression(object)?;
                match &object {
                    Value::Object(target) => target.borrow_mut().set_attribute(name, value),
                    other => Err(RuntimeError::AttributeNotSettable {
                        type_name: other.type_name().to_string(),
                    }),
                }
            }
            AssignTarget::Index { object, index } => {
                let object = self.eval_expression(object)?;
                let index = self.eval_expression(index)?.as_integer()?;
                match &object {
                    Value::Object(target) => target.borrow_mut().index_set(index, value),
                    other => Err(RuntimeError::ExpectedListType {
                        got: other.type_name().to_string(),
                    }),
                }
            }
        }
    }

    fn iterable_values(&self, value: &Value) -> Result<Vec<Value>, RuntimeError> {
        match value {
            Value::Object(object) => object.borrow().items(),
            other => Err(RuntimeError::ExpectedListType {
                got: other.type_name().to_string(),
            }),
        }
    }

    fn eval_comprehension(
        &mut self,
        element: &Expression,
        clause: &Comprehension,
    ) -> Result<Value, RuntimeError> {
        let items = {
            let iterable = self.eval_expression(&clause.iterable)?;
            self.iterable_values(&iterable)?
        };
        let mut values = Vec::new();
        for item in items {
            self.assign_target(&clause.target, item)?;
            if let Some(condition) = &clause.condition
                && !self.eval_expression(condition)?.is_truthy()
            {
                continue;
            }
            values.push(self.eval_expression(element)?);
        }
        Ok(Value::list(values))
    }

    fn active_frame(&self) -> &Rc<Frame> {
        self.frames
            .last()
            .expect("execution always runs inside a frame")
    }
}

impl CallContext for Interpreter {
    fn frame_stack(&self) -> Vec<Rc<dyn StackFrame>> {
        self.frames
            .iter()
            .map(|frame| frame.clone() as Rc<dyn StackFrame>)
            .collect()
    }

    fn current_frame(&self) -> Rc<dyn StackFrame> {
        self.active_frame().clone()
    }

    fn engine(&self) -> &Rc<Engine> {
        &self.engine
    }

    fn push_frame(&mut self, frame: Rc<Frame>) {
        self.frames.push(frame);
    }

    fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn write_output(&mut self, line: String) {
        self.output.push(line);
    }
}
