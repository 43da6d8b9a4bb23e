//! Runtime-object faces of [`crate::dispatch::Dispatcher`].
//!
//! A dispatcher reaches script code as a [`DispatcherObject`] member of the
//! introspection namespace. Attribute access may pre-bind it to the call
//! site it was fetched for, producing a [`BoundDispatchObject`]; calling the
//! unbound object instead resolves the site by identity at call time.

use std::any::Any;
use std::rc::Rc;

use crate::dispatch::Dispatcher;
use crate::frame::FrameContext;
use crate::runtime::error::RuntimeError;
use crate::runtime::object::{CallContext, ObjectRef, RuntimeObject};
use crate::runtime::value::Value;

pub struct DispatcherObject {
    dispatcher: Rc<Dispatcher>,
}

impl DispatcherObject {
    pub fn new(dispatcher: Rc<Dispatcher>) -> DispatcherObject {
        DispatcherObject { dispatcher }
    }

    pub fn dispatcher(&self) -> &Rc<Dispatcher> {
        &self.dispatcher
    }
}

impl RuntimeObject for DispatcherObject {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "dispatcher"
    }

    fn render(&self) -> String {
        format!("<dispatcher {}>", self.dispatcher.name())
    }

    fn call(
        &self,
        receiver: &ObjectRef,
        context: &mut dyn CallContext,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let frame = context.current_frame();
        self.dispatcher
            .invoke(&frame, &Value::Object(receiver.clone()), args)
    }
}

/// A dispatcher pinned to the single call site its attribute access was the
/// callee of. Calling it runs the logic without re-resolving.
pub struct BoundDispatchObject {
    dispatcher: Rc<Dispatcher>,
    context: FrameContext,
}

impl BoundDispatchObject {
    pub fn new(dispatcher: Rc<Dispatcher>, context: FrameContext) -> BoundDispatchObject {
        BoundDispatchObject {
            dispatcher,
            context,
        }
    }
}

impl RuntimeObject for BoundDispatchObject {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "bound_dispatch"
    }

    fn render(&self) -> String {
        format!("<bound dispatch {}>", self.dispatcher.name())
    }

    fn call(
        &self,
        _receiver: &ObjectRef,
        _context: &mut dyn CallContext,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        self.dispatcher.run(&self.context, args)
    }
}
