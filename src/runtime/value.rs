use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::frame::CodeId;
use crate::runtime::builtins::BuiltinFunction;
use crate::runtime::error::RuntimeError;
use crate::runtime::list::ListObject;
use crate::runtime::object::{ObjectRef, RuntimeObject};

/// A runtime value. Scalars are stored inline; everything with identity or
/// interior state lives behind an [`ObjectRef`].
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Str(Rc<str>),
    None,
    Function { name: Rc<str>, code: CodeId },
    Builtin(BuiltinFunction),
    Object(ObjectRef),
}

impl Value {
    pub fn string(text: impl Into<Rc<str>>) -> Value {
        Value::Str(text.into())
    }

    pub fn object(object: impl RuntimeObject + 'static) -> Value {
        let boxed: Box<dyn RuntimeObject> = Box::new(object);
        Value::Object(Rc::new(RefCell::new(boxed)))
    }

    pub fn list(values: Vec<Value>) -> Value {
        Value::object(ListObject::new(values))
    }

    /// Identity in the source language's sense: the predicate bare-name
    /// resolution matches candidates with. Objects compare by allocation,
    /// functions by code, scalars by value (their identity is their value).
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(left), Value::Integer(right)) => left == right,
            (Value::Boolean(left), Value::Boolean(right)) => left == right,
            (Value::Str(left), Value::Str(right)) => left == right,
            (Value::None, Value::None) => true,
            (Value::Function { code: left, .. }, Value::Function { code: right, .. }) => {
                left == right
            }
            (Value::Builtin(left), Value::Builtin(right)) => left == right,
            (Value::Object(left), Value::Object(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(value) => *value != 0,
            Value::Boolean(value) => *value,
            Value::Str(value) => !value.is_empty(),
            Value::None => false,
            Value::Function { .. } | Value::Builtin(_) => true,
            Value::Object(object) => object.borrow().is_truthy(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Boolean(_) => "bool",
            Value::Str(_) => "str",
            Value::None => "NoneType",
            Value::Function { .. } => "function",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Object(object) => object.borrow().type_name(),
        }
    }

    /// Text the value prints as.
    pub fn render(&self) -> String {
        match self {
            Value::Integer(value) => value.to_string(),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
            Value::Str(value) => value.to_string(),
            Value::None => "None".to_string(),
            Value::Function { name, .. } => format!("<function {name}>"),
            Value::Builtin(builtin) => format!("<built-in function {}>", builtin.name()),
            Value::Object(object) => object.borrow().render(),
        }
    }

    pub fn as_integer(&self) -> Result<i64, RuntimeError> {
        match self {
            Value::Integer(value) => Ok(*value),
            other => Err(RuntimeError::ExpectedIntegerType {
                got: other.type_name().to_string(),
            }),
        }
    }

    pub fn add(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        Ok(Value::Integer(self.as_integer()? + rhs.as_integer()?))
    }

    pub fn sub(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        Ok(Value::Integer(self.as_integer()? - rhs.as_integer()?))
    }

    pub fn lt(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        Ok(Value::Boolean(self.as_integer()? < rhs.as_integer()?))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "Integer({value})"),
            Value::Boolean(value) => write!(f, "Boolean({value})"),
            Value::Str(value) => write!(f, "Str({value:?})"),
            Value::None => f.write_str("None"),
            Value::Function { name, .. } => write!(f, "Function({name})"),
            Value::Builtin(builtin) => write!(f, "Builtin({})", builtin.name()),
            Value::Object(object) => write!(f, "Object({})", object.borrow().type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_python_style_scalars() {
        assert_eq!(Value::Integer(7).render(), "7");
        assert_eq!(Value::Boolean(true).render(), "True");
        assert_eq!(Value::Boolean(false).render(), "False");
        assert_eq!(Value::string("hi").render(), "hi");
        assert_eq!(Value::None.render(), "None");
    }

    #[test]
    fn renders_lists_without_quotes() {
        let list = Value::list(vec![Value::Integer(1), Value::string("a")]);
        assert_eq!(list.render(), "[1, a]");
    }

    #[test]
    fn object_identity_is_per_allocation() {
        let first = Value::list(vec![Value::Integer(1)]);
        let second = Value::list(vec![Value::Integer(1)]);
        assert!(first.is(&first.clone()));
        assert!(!first.is(&second));
    }

    #[test]
    fn scalar_identity_is_value_equality() {
        assert!(Value::Integer(3).is(&Value::Integer(3)));
        assert!(!Value::Integer(3).is(&Value::Integer(4)));
        assert!(Value::string("a").is(&Value::string("a")));
        assert!(!Value::None.is(&Value::Integer(0)));
    }

    #[test]
    fn function_identity_follows_code() {
        let first = Value::Function {
            name: "f".into(),
            code: CodeId::new(3),
        };
        let renamed = Value::Function {
            name: "alias".into(),
            code: CodeId::new(3),
        };
        let other = Value::Function {
            name: "f".into(),
            code: CodeId::new(4),
        };
        assert!(first.is(&renamed));
        assert!(!first.is(&other));
    }

    #[test]
    fn truthiness_matches_the_source_language() {
        assert!(Value::Integer(1).is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(!Value::None.is_truthy());
        assert!(!Value::list(Vec::new()).is_truthy());
        assert!(Value::list(vec![Value::None]).is_truthy());
    }
}
