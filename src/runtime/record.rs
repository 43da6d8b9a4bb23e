use std::any::Any;

use crate::runtime::error::RuntimeError;
use crate::runtime::object::{CallContext, ObjectRef, RuntimeObject};
use crate::runtime::value::Value;

/// Open attribute bag created by the `record()` builtin. Attributes keep
/// insertion order, which also fixes the render order.
pub struct RecordObject {
    fields: Vec<(String, Value)>,
}

impl RecordObject {
    pub fn new() -> RecordObject {
        RecordObject { fields: Vec::new() }
    }
}

impl Default for RecordObject {
    fn default() -> RecordObject {
        RecordObject::new()
    }
}

impl RuntimeObject for RecordObject {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "record"
    }

    fn render(&self) -> String {
        let rendered = self
            .fields
            .iter()
            .map(|(name, value)| format!("{name}={}", value.render()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("record({rendered})")
    }

    fn get_attribute(
        &self,
        _receiver: &ObjectRef,
        _context: &mut dyn CallContext,
        attribute: &str,
    ) -> Result<Value, RuntimeError> {
        self.fields
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| RuntimeError::UnknownAttribute {
                attribute: attribute.to_string(),
                type_name: self.type_name().to_string(),
            })
    }

    fn set_attribute(&mut self, attribute: &str, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self
            .fields
            .iter_mut()
            .find(|(name, _)| name == attribute)
            .map(|(_, slot)| slot)
        {
            *slot = value;
        } else {
            self.fields.push((attribute.to_string(), value));
        }
        Ok(())
    }
}
