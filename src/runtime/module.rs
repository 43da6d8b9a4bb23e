//! Namespace adapter: a read-only attribute bag whose dispatcher members
//! resolve their call site during the attribute lookup itself.
//!
//! Looking up a member runs inside a trampoline frame registered as
//! excluded machinery, so resolution walks past it to the script frame
//! that performed the access. A dispatcher member whose access is the
//! callee of exactly one call on that frame's line comes back pre-bound;
//! any other member passes through unchanged.

use std::any::Any;
use std::path::PathBuf;
use std::rc::Rc;

use crate::dispatch::{Access, Dispatcher, Engine};
use crate::runtime::activation::{Frame, FunctionRegistry};
use crate::runtime::dispatcher::{BoundDispatchObject, DispatcherObject};
use crate::runtime::error::RuntimeError;
use crate::runtime::object::{CallContext, ObjectRef, RuntimeObject};
use crate::runtime::value::Value;

pub struct NamespaceObject {
    name: String,
    members: Vec<(String, Value)>,
    trampoline: Rc<Frame>,
}

impl NamespaceObject {
    /// Builds the namespace and registers its lookup code as excluded, so
    /// dispatchers reached through it see the real caller's frame.
    pub fn new(
        name: impl Into<String>,
        members: Vec<(String, Value)>,
        registry: &mut FunctionRegistry,
        engine: &Engine,
    ) -> NamespaceObject {
        let name = name.into();
        let code = registry.register_native(format!("{name}.__getattr__"));
        engine.exclude(code);
        let path = Rc::new(PathBuf::from(format!("<{name}>")));
        NamespaceObject {
            trampoline: Rc::new(Frame::trampoline(code, path)),
            name,
            members,
        }
    }
}

fn dispatcher_of(member: &Value) -> Option<Rc<Dispatcher>> {
    let Value::Object(object) = member else {
        return None;
    };
    let object = object.borrow();
    object
        .as_any()
        .downcast_ref::<DispatcherObject>()
        .map(|dispatcher| dispatcher.dispatcher().clone())
}

fn resolve_member(context: &mut dyn CallContext, member: Value) -> Result<Value, RuntimeError> {
    let Some(dispatcher) = dispatcher_of(&member) else {
        return Ok(member);
    };
    match dispatcher.access(&context.frame_stack())? {
        Access::PassThrough => Ok(member),
        Access::Bound(call_site) => Ok(Value::object(BoundDispatchObject::new(
            dispatcher, call_site,
        ))),
    }
}

impl RuntimeObject for NamespaceObject {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "namespace"
    }

    fn render(&self) -> String {
        format!("<namespace {}>", self.name)
    }

    fn get_attribute(
        &self,
        _receiver: &ObjectRef,
        context: &mut dyn CallContext,
        attribute: &str,
    ) -> Result<Value, RuntimeError> {
        let member = self
            .members
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| RuntimeError::UnknownAttribute {
                attribute: attribute.to_string(),
                type_name: self.type_name().to_string(),
            })?;
        context.push_frame(self.trampoline.clone());
        let resolved = resolve_member(context, member);
        context.pop_frame();
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;

    use rustc_hash::FxHashMap;

    use crate::frame::StackFrame;
    use crate::source::ResolveError;
    use crate::source::document::SourceDocument;

    struct TestContext {
        engine: Rc<Engine>,
        frames: Vec<Rc<Frame>>,
        output: Vec<String>,
    }

    impl CallContext for TestContext {
        fn frame_stack(&self) -> Vec<Rc<dyn StackFrame>> {
            self.frames
                .iter()
                .map(|frame| frame.clone() as Rc<dyn StackFrame>)
                .collect()
        }

        fn current_frame(&self) -> Rc<dyn StackFrame> {
            let frame = self.frames.last().expect("test stack is never empty");
            frame.clone()
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

    fn namespace_for(source: &str, line: usize) -> (TestContext, Value) {
        let engine = Rc::new(Engine::new());
        let document = SourceDocument::from_source(PathBuf::from("case.py"), source)
            .expect("test source should parse");
        engine.register_document(document);
        let frame = Rc::new(Frame::module(
            Rc::new(PathBuf::from("case.py")),
            Rc::new(RefCell::new(FxHashMap::default())),
            Rc::new(RefCell::new(FxHashMap::default())),
        ));
        frame.set_line(line);
        let dispatcher = Rc::new(Dispatcher::new(
            engine.clone(),
            "target",
            |context, _args| {
                let names = context.assigned_names().map_err(|error| {
                    RuntimeError::CallSite {
                        path: context.document().path().to_path_buf(),
                        line: context.call().line(),
                        error,
                    }
                })?;
                Ok(Value::string(names.join(" ")))
            },
        ));
        let members = vec![
            (
                "target".to_string(),
                Value::object(DispatcherObject::new(dispatcher)),
            ),
            ("version".to_string(), Value::string("0.1.0")),
        ];
        let mut registry = FunctionRegistry::new();
        let namespace = NamespaceObject::new("scry", members, &mut registry, &engine);
        let context = TestContext {
            engine,
            frames: vec![frame],
            output: Vec::new(),
        };
        (context, Value::object(namespace))
    }

    fn get_attribute(
        context: &mut TestContext,
        namespace: &Value,
        attribute: &str,
    ) -> Result<Value, RuntimeError> {
        let Value::Object(object) = namespace else {
            panic!("namespace should be an object");
        };
        let result = object.borrow().get_attribute(object, context, attribute);
        result
    }

    #[test]
    fn attribute_access_pre_binds_to_the_call_site() {
        let (mut context, namespace) = namespace_for("name = scry.target()\n", 1);
        let resolved = get_attribute(&mut context, &namespace, "target")
            .expect("attribute lookup should succeed");
        let Value::Object(bound) = &resolved else {
            panic!("expected a bound dispatch object");
        };
        assert_eq!(bound.borrow().type_name(), "bound_dispatch");
        let result = bound
            .borrow()
            .call(bound, &mut context, Vec::new())
            .expect("bound dispatch should run");
        assert!(matches!(result, Value::Str(text) if &*text == "name"));
        assert_eq!(context.frames.len(), 1);
        assert!(context.output.is_empty());
    }

    #[test]
    fn dispatcher_without_a_call_passes_through() {
        let (mut context, namespace) = namespace_for("alias = scry.target\n", 1);
        let resolved = get_attribute(&mut context, &namespace, "target")
            .expect("attribute lookup should succeed");
        let Value::Object(member) = &resolved else {
            panic!("expected the dispatcher itself");
        };
        assert_eq!(member.borrow().type_name(), "dispatcher");
        assert_eq!(context.frames.len(), 1);
    }

    #[test]
    fn plain_members_skip_resolution() {
        let (mut context, namespace) = namespace_for("value = scry.version\n", 1);
        let resolved = get_attribute(&mut context, &namespace, "version")
            .expect("attribute lookup should succeed");
        assert!(matches!(resolved, Value::Str(text) if &*text == "0.1.0"));
        assert_eq!(context.frames.len(), 1);
    }

    #[test]
    fn missing_member_is_reported() {
        let (mut context, namespace) = namespace_for("x = scry.nothing\n", 1);
        let error = get_attribute(&mut context, &namespace, "nothing");
        assert_eq!(
            error.err(),
            Some(RuntimeError::UnknownAttribute {
                attribute: "nothing".to_string(),
                type_name: "namespace".to_string(),
            })
        );
    }

    #[test]
    fn ambiguous_access_restores_the_stack() {
        let (mut context, namespace) =
            namespace_for("pair = scry.target() + scry.target()\n", 1);
        let error = get_attribute(&mut context, &namespace, "target");
        assert_eq!(
            error.err(),
            Some(RuntimeError::CallSite {
                path: Path::new("case.py").to_path_buf(),
                line: 1,
                error: ResolveError::AmbiguousCall {
                    candidates: 2,
                    name: "target".to_string(),
                    line: 1,
                },
            })
        );
        assert_eq!(context.frames.len(), 1);
    }
}
