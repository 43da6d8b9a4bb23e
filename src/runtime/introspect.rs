//! The `scry` namespace: introspection operations over the caller's own
//! source. Each operation is a [`Dispatcher`] whose logic reads the resolved
//! call site instead of its arguments.

use std::rc::Rc;

use crate::dispatch::{Dispatcher, Engine};
use crate::frame::FrameContext;
use crate::runtime::dispatcher::DispatcherObject;
use crate::runtime::error::RuntimeError;
use crate::runtime::interp::Interpreter;
use crate::runtime::module::NamespaceObject;
use crate::runtime::value::Value;
use crate::source::ResolveError;

pub const NAMESPACE: &str = "scry";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn call_site_error(context: &FrameContext, error: ResolveError) -> RuntimeError {
    RuntimeError::CallSite {
        path: context.document().path().to_path_buf(),
        line: context.call().line(),
        error,
    }
}

/// `scry.assigned_names()`: the names the surrounding statement binds the
/// call's result to, as a list of strings.
fn assigned_names(context: &FrameContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    RuntimeError::expect_function_arity("assigned_names", 0, args.len())?;
    let names = context
        .assigned_names()
        .map_err(|error| call_site_error(context, error))?;
    Ok(Value::list(
        names
            .iter()
            .map(|name| Value::string(name.as_str()))
            .collect(),
    ))
}

/// `scry.statement_text()`: the enclosing statement rendered on one line.
fn statement_text(context: &FrameContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    RuntimeError::expect_function_arity("statement_text", 0, args.len())?;
    let statement = context
        .enclosing_statement()
        .map_err(|error| call_site_error(context, error))?;
    Ok(Value::string(statement.text()))
}

/// `scry.target()`: the single assignment target, as a string.
fn target(context: &FrameContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
    RuntimeError::expect_function_arity("target", 0, args.len())?;
    let names = context
        .assigned_names()
        .map_err(|error| call_site_error(context, error))?;
    match &*names {
        [name] => Ok(Value::string(name.as_str())),
        names => Err(RuntimeError::SingleTargetExpected { found: names.len() }),
    }
}

type LogicFn = fn(&FrameContext, Vec<Value>) -> Result<Value, RuntimeError>;

fn dispatcher_member(engine: &Rc<Engine>, name: &str, logic: LogicFn) -> (String, Value) {
    let dispatcher = Rc::new(Dispatcher::new(engine.clone(), name, logic));
    (
        name.to_string(),
        Value::object(DispatcherObject::new(dispatcher)),
    )
}

/// Installs the namespace into the interpreter's builtin scope.
pub fn install(interpreter: &mut Interpreter) {
    let engine = interpreter.engine().clone();
    let members = vec![
        dispatcher_member(&engine, "assigned_names", assigned_names),
        dispatcher_member(&engine, "statement_text", statement_text),
        dispatcher_member(&engine, "target", target),
        ("version".to_string(), Value::string(VERSION)),
    ];
    let namespace = NamespaceObject::new(NAMESPACE, members, interpreter.registry_mut(), &engine);
    interpreter.define_builtin(NAMESPACE, Value::object(namespace));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    use rustc_hash::FxHashMap;

    use crate::frame::StackFrame;
    use crate::runtime::activation::Frame;
    use crate::source::document::SourceDocument;

    fn bound_context(source: &str, name: &str) -> FrameContext {
        let engine = Engine::new();
        let document = SourceDocument::from_source(PathBuf::from("case.py"), source)
            .expect("test source should parse");
        let document = engine.register_document(document);
        let call = document
            .attribute_call_at(1, name)
            .expect("call lookup should succeed")
            .expect("line should contain the call")
            .id();
        let frame: Rc<dyn StackFrame> = Rc::new(Frame::module(
            Rc::new(PathBuf::from("case.py")),
            Rc::new(RefCell::new(FxHashMap::default())),
            Rc::new(RefCell::new(FxHashMap::default())),
        ));
        FrameContext::new(frame, document, call)
    }

    #[test]
    fn target_returns_the_single_name() {
        let context = bound_context("name = scry.target()\n", "target");
        let value = target(&context, Vec::new()).expect("target should resolve");
        assert!(matches!(value, Value::Str(text) if &*text == "name"));
    }

    #[test]
    fn target_rejects_multiple_names() {
        let context = bound_context("a, b = scry.target()\n", "target");
        let error = target(&context, Vec::new());
        assert_eq!(
            error.err(),
            Some(RuntimeError::SingleTargetExpected { found: 2 })
        );
    }

    #[test]
    fn assigned_names_lists_every_target() {
        let context = bound_context("a, b = scry.assigned_names()\n", "assigned_names");
        let value =
            assigned_names(&context, Vec::new()).expect("assigned_names should resolve");
        assert_eq!(value.render(), "[a, b]");
    }

    #[test]
    fn statement_text_renders_the_whole_statement() {
        let context = bound_context("full = scry.statement_text()\n", "statement_text");
        let value =
            statement_text(&context, Vec::new()).expect("statement_text should resolve");
        assert!(matches!(value, Value::Str(text) if &*text == "full = scry.statement_text()"));
    }

    #[test]
    fn operations_take_no_arguments() {
        let context = bound_context("name = scry.target()\n", "target");
        let error = target(&context, vec![Value::Integer(1)]);
        assert_eq!(
            error.err(),
            Some(RuntimeError::FunctionArityMismatch {
                name: "target".to_string(),
                expected: 0,
                found: 1,
            })
        );
    }

    #[test]
    fn resolution_failures_carry_the_call_site() {
        let context = bound_context("scry.target()\n", "target");
        let error = target(&context, Vec::new());
        assert_eq!(
            error.err(),
            Some(RuntimeError::CallSite {
                path: PathBuf::from("case.py"),
                line: 1,
                error: ResolveError::NoAssignment,
            })
        );
    }
}
