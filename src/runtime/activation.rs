//! Activation frames and the code registry behind [`crate::frame::CodeId`].

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::Statement;
use crate::frame::{BindingTier, CodeId, StackFrame};
use crate::runtime::value::Value;

/// One scripted function: parameter names plus the shared body.
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<[Statement]>,
}

pub enum CodeEntry {
    Function(Rc<FunctionDef>),
    /// Machinery with no scripted body, e.g. the namespace trampoline.
    Native { name: String },
}

/// Allocates and resolves code identities. Id 0 is the module top level;
/// every scripted function and native trampoline gets its own id.
pub struct FunctionRegistry {
    entries: Vec<CodeEntry>,
}

impl FunctionRegistry {
    pub fn new() -> FunctionRegistry {
        FunctionRegistry {
            entries: vec![CodeEntry::Native {
                name: "<module>".to_string(),
            }],
        }
    }

    pub fn register_function(&mut self, function: FunctionDef) -> CodeId {
        let code = CodeId::new(self.entries.len() as u32);
        self.entries.push(CodeEntry::Function(Rc::new(function)));
        code
    }

    pub fn register_native(&mut self, name: impl Into<String>) -> CodeId {
        let code = CodeId::new(self.entries.len() as u32);
        self.entries.push(CodeEntry::Native { name: name.into() });
        code
    }

    pub fn function(&self, code: CodeId) -> Option<&Rc<FunctionDef>> {
        match self.entries.get(code.index()) {
            Some(CodeEntry::Function(function)) => Some(function),
            _ => None,
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> FunctionRegistry {
        FunctionRegistry::new()
    }
}

/// A live activation. The interpreter keeps these on an explicit stack and
/// updates `line` as execution moves, so resolution always sees the caller's
/// current position.
pub struct Frame {
    code: CodeId,
    path: Rc<PathBuf>,
    line: Cell<usize>,
    locals: Option<RefCell<FxHashMap<String, Value>>>,
    globals: Rc<RefCell<FxHashMap<String, Value>>>,
    builtins: Rc<RefCell<FxHashMap<String, Value>>>,
}

impl Frame {
    pub fn module(
        path: Rc<PathBuf>,
        globals: Rc<RefCell<FxHashMap<String, Value>>>,
        builtins: Rc<RefCell<FxHashMap<String, Value>>>,
    ) -> Frame {
        Frame {
            code: CodeId::MODULE,
            path,
            line: Cell::new(1),
            locals: None,
            globals,
            builtins,
        }
    }

    pub fn function(
        code: CodeId,
        path: Rc<PathBuf>,
        locals: FxHashMap<String, Value>,
        globals: Rc<RefCell<FxHashMap<String, Value>>>,
        builtins: Rc<RefCell<FxHashMap<String, Value>>>,
    ) -> Frame {
        Frame {
            code,
            path,
            line: Cell::new(1),
            locals: Some(RefCell::new(locals)),
            globals,
            builtins,
        }
    }

    /// Frame for excluded machinery. It carries no bindings; resolution
    /// walks straight past it.
    pub fn trampoline(code: CodeId, path: Rc<PathBuf>) -> Frame {
        Frame {
            code,
            path,
            line: Cell::new(0),
            locals: Some(RefCell::new(FxHashMap::default())),
            globals: Rc::new(RefCell::new(FxHashMap::default())),
            builtins: Rc::new(RefCell::new(FxHashMap::default())),
        }
    }

    pub fn set_line(&self, line: usize) {
        self.line.set(line);
    }

    pub fn source_path(&self) -> &Rc<PathBuf> {
        &self.path
    }

    pub fn has_locals(&self) -> bool {
        self.locals.is_some()
    }

    /// Binds `name` in this frame's innermost tier: locals inside a
    /// function, globals at module level.
    pub fn store(&self, name: String, value: Value) {
        match &self.locals {
            Some(locals) => {
                locals.borrow_mut().insert(name, value);
            }
            None => {
                self.globals.borrow_mut().insert(name, value);
            }
        }
    }
}

impl StackFrame for Frame {
    fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn line(&self) -> usize {
        self.line.get()
    }

    fn code(&self) -> CodeId {
        self.code
    }

    fn lookup(&self, tier: BindingTier, name: &str) -> Option<Value> {
        match tier {
            BindingTier::Local => self
                .locals
                .as_ref()
                .and_then(|locals| locals.borrow().get(name).cloned()),
            // The subset has no closures, so nothing ever binds here.
            BindingTier::Enclosing => None,
            BindingTier::Global => self.globals.borrow().get(name).cloned(),
            BindingTier::Builtin => self.builtins.borrow().get(name).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::resolve_name;

    fn shared_map(entries: &[(&str, Value)]) -> Rc<RefCell<FxHashMap<String, Value>>> {
        Rc::new(RefCell::new(
            entries
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        ))
    }

    #[test]
    fn registry_allocates_ids_after_the_module() {
        let mut registry = FunctionRegistry::new();
        let first = registry.register_function(FunctionDef {
            name: "f".to_string(),
            params: Vec::new(),
            body: Vec::new().into(),
        });
        let second = registry.register_native("trampoline");
        assert_ne!(first, CodeId::MODULE);
        assert_ne!(first, second);
        assert!(registry.function(first).is_some());
        assert!(registry.function(second).is_none());
        assert!(registry.function(CodeId::MODULE).is_none());
    }

    #[test]
    fn module_store_binds_globally() {
        let globals = shared_map(&[]);
        let frame = Frame::module(
            Rc::new(PathBuf::from("case.py")),
            globals.clone(),
            shared_map(&[]),
        );
        frame.store("x".to_string(), Value::Integer(1));
        assert!(globals.borrow().contains_key("x"));
        let value = resolve_name(&frame, "x").expect("name should resolve");
        assert!(matches!(value, Value::Integer(1)));
    }

    #[test]
    fn function_locals_shadow_globals_and_builtins() {
        let globals = shared_map(&[("x", Value::Integer(10))]);
        let builtins = shared_map(&[("x", Value::Integer(100))]);
        let frame = Frame::function(
            CodeId::new(1),
            Rc::new(PathBuf::from("case.py")),
            FxHashMap::default(),
            globals,
            builtins,
        );
        let value = resolve_name(&frame, "x").expect("name should resolve");
        assert!(matches!(value, Value::Integer(10)));
        frame.store("x".to_string(), Value::Integer(1));
        let value = resolve_name(&frame, "x").expect("name should resolve");
        assert!(matches!(value, Value::Integer(1)));
    }

    #[test]
    fn line_updates_are_visible_through_the_contract() {
        let frame = Frame::module(
            Rc::new(PathBuf::from("case.py")),
            shared_map(&[]),
            shared_map(&[]),
        );
        assert_eq!(frame.line(), 1);
        frame.set_line(7);
        assert_eq!(frame.line(), 7);
    }
}
