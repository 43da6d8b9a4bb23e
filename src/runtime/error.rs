use std::path::PathBuf;

use thiserror::Error;

use crate::source::ResolveError;
use crate::source::document::LoadError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    FunctionArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Unknown attribute '{attribute}' for type {type_name}")]
    UnknownAttribute {
        attribute: String,
        type_name: String,
    },
    #[error("Attributes of type {type_name} cannot be assigned")]
    AttributeNotSettable { type_name: String },
    #[error("Object of type {type_name} is not callable")]
    ObjectNotCallable { type_name: String },
    #[error("Expected an integer, got {got}")]
    ExpectedIntegerType { got: String },
    #[error("Expected a list, got {got}")]
    ExpectedListType { got: String },
    #[error("List index must be non-negative, got {index}")]
    NegativeListIndex { index: i64 },
    #[error("List index out of bounds: index {index}, len {len}")]
    ListIndexOutOfBounds { index: usize, len: usize },
    #[error("Cannot unpack {found} values into {expected} targets")]
    UnpackMismatch { expected: usize, found: usize },
    #[error("Nested function definitions are not supported")]
    NestedFunctionDefinitionsUnsupported,
    #[error("Return outside of function")]
    ReturnOutsideFunction,
    #[error("Expected a single assignment target, found {found}")]
    SingleTargetExpected { found: usize },
    /// A call-site resolution failure, attributed to the caller's own
    /// location rather than to resolver internals.
    #[error("{}:{line}: {error}", path.display())]
    CallSite {
        path: PathBuf,
        line: usize,
        error: ResolveError,
    },
    #[error(transparent)]
    Source {
        #[from]
        error: LoadError,
    },
}

impl RuntimeError {
    pub fn expect_function_arity(
        name: &str,
        expected: usize,
        found: usize,
    ) -> Result<(), RuntimeError> {
        if expected == found {
            Ok(())
        } else {
            Err(RuntimeError::FunctionArityMismatch {
                name: name.to_string(),
                expected,
                found,
            })
        }
    }
}
