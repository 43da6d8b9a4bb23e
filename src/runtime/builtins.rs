//! Built-in functions available to every program.

use crate::runtime::error::RuntimeError;
use crate::runtime::object::CallContext;
use crate::runtime::record::RecordObject;
use crate::runtime::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Print,
    Len,
    Range,
    Record,
}

impl BuiltinFunction {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinFunction::Print => "print",
            BuiltinFunction::Len => "len",
            BuiltinFunction::Range => "range",
            BuiltinFunction::Record => "record",
        }
    }

    pub fn all() -> [BuiltinFunction; 4] {
        [
            BuiltinFunction::Print,
            BuiltinFunction::Len,
            BuiltinFunction::Range,
            BuiltinFunction::Record,
        ]
    }
}

pub fn call_builtin(
    builtin: BuiltinFunction,
    context: &mut dyn CallContext,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match builtin {
        BuiltinFunction::Print => {
            let rendered: Vec<String> = args.iter().map(Value::render).collect();
            context.write_output(rendered.join(" "));
            Ok(Value::None)
        }
        BuiltinFunction::Len => {
            RuntimeError::expect_function_arity("len", 1, args.len())?;
            let length = match &args[0] {
                Value::Object(object) => object.borrow().length()?,
                Value::Str(text) => text.chars().count(),
                other => {
                    return Err(RuntimeError::ExpectedListType {
                        got: other.type_name().to_string(),
                    });
                }
            };
            Ok(Value::Integer(length as i64))
        }
        BuiltinFunction::Range => {
            RuntimeError::expect_function_arity("range", 1, args.len())?;
            let end = args[0].as_integer()?;
            Ok(Value::list((0..end).map(Value::Integer).collect()))
        }
        BuiltinFunction::Record => {
            RuntimeError::expect_function_arity("record", 0, args.len())?;
            Ok(Value::object(RecordObject::new()))
        }
    }
}
