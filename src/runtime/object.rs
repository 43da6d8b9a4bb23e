use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::dispatch::Engine;
use crate::frame::StackFrame;
use crate::runtime::activation::Frame;
use crate::runtime::error::RuntimeError;
use crate::runtime::value::Value;

pub type ObjectRef = Rc<RefCell<Box<dyn RuntimeObject>>>;

/// Interpreter services an object may use while it handles an operation.
pub trait CallContext {
    /// Live activation frames, innermost last. Non-empty while code runs.
    fn frame_stack(&self) -> Vec<Rc<dyn StackFrame>>;

    /// The innermost frame.
    fn current_frame(&self) -> Rc<dyn StackFrame>;

    fn engine(&self) -> &Rc<Engine>;

    /// Pushes a frame the interpreter did not create itself, e.g. the
    /// namespace adapter's trampoline. Callers pair this with `pop_frame`.
    fn push_frame(&mut self, frame: Rc<Frame>);

    fn pop_frame(&mut self);

    /// Appends one line to the program's collected output.
    fn write_output(&mut self, line: String);
}

/// Protocol for heap values. The default bodies reject each operation with
/// the object's type name, so implementations override only what their type
/// supports.
pub trait RuntimeObject {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn type_name(&self) -> &'static str;

    /// Text the object prints as.
    fn render(&self) -> String;

    fn is_truthy(&self) -> bool {
        true
    }

    fn get_attribute(
        &self,
        _receiver: &ObjectRef,
        _context: &mut dyn CallContext,
        attribute: &str,
    ) -> Result<Value, RuntimeError> {
        Err(RuntimeError::UnknownAttribute {
            attribute: attribute.to_string(),
            type_name: self.type_name().to_string(),
        })
    }

    fn set_attribute(&mut self, _attribute: &str, _value: Value) -> Result<(), RuntimeError> {
        Err(RuntimeError::AttributeNotSettable {
            type_name: self.type_name().to_string(),
        })
    }

    fn call(
        &self,
        _receiver: &ObjectRef,
        _context: &mut dyn CallContext,
        _args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        Err(RuntimeError::ObjectNotCallable {
            type_name: self.type_name().to_string(),
        })
    }

    fn index_get(&self, _index: i64) -> Result<Value, RuntimeError> {
        Err(RuntimeError::ExpectedListType {
            got: self.type_name().to_string(),
        })
    }

    fn index_set(&mut self, _index: i64, _value: Value) -> Result<(), RuntimeError> {
        Err(RuntimeError::ExpectedListType {
            got: self.type_name().to_string(),
        })
    }

    /// Elements for iteration and unpacking, in order.
    fn items(&self) -> Result<Vec<Value>, RuntimeError> {
        Err(RuntimeError::ExpectedListType {
            got: self.type_name().to_string(),
        })
    }

    fn length(&self) -> Result<usize, RuntimeError> {
        Err(RuntimeError::ExpectedListType {
            got: self.type_name().to_string(),
        })
    }
}
