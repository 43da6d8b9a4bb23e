//! Stack frames as seen by call-site resolution.
//!
//! Resolution never touches the interpreter's concrete frame type. It works
//! against [`StackFrame`], which exposes exactly what a call site needs: the
//! source path, the executing line, the code identity, and name lookup in the
//! frame's scope tiers. Tests drive the resolver with hand-built frames.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::runtime::value::Value;
use crate::source::ResolveError;
use crate::source::document::{CallRef, SourceDocument, StatementRef};
use crate::source::map::NodeId;

/// Identity of one code object: a function body or a whole module.
///
/// Frames executing the same function share a `CodeId`, which is what the
/// exclusion registry keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeId(u32);

impl CodeId {
    /// Module top level.
    pub const MODULE: CodeId = CodeId(0);

    pub(crate) fn new(raw: u32) -> CodeId {
        CodeId(raw)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// One tier of a frame's scope chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTier {
    Local,
    Enclosing,
    Global,
    Builtin,
}

const LOOKUP_ORDER: [BindingTier; 4] = [
    BindingTier::Local,
    BindingTier::Enclosing,
    BindingTier::Global,
    BindingTier::Builtin,
];

/// A live frame on the interpreter's call stack.
pub trait StackFrame {
    /// Source file this frame executes.
    fn path(&self) -> &Path;

    /// Line currently executing. The interpreter keeps this pinned to the
    /// statement or expression being evaluated.
    fn line(&self) -> usize;

    /// Code object this frame runs.
    fn code(&self) -> CodeId;

    /// Value bound to `name` in one scope tier, if any.
    fn lookup(&self, tier: BindingTier, name: &str) -> Option<Value>;
}

/// Resolves `name` the way the frame itself would: innermost tier first.
pub fn resolve_name(frame: &dyn StackFrame, name: &str) -> Result<Value, ResolveError> {
    for tier in LOOKUP_ORDER {
        if let Some(value) = frame.lookup(tier, name) {
            return Ok(value);
        }
    }
    Err(ResolveError::UnresolvedName {
        name: name.to_string(),
    })
}

/// A resolved call site: the live frame paired with the syntax node of the
/// call expression that produced it.
#[derive(Clone)]
pub struct FrameContext {
    frame: Rc<dyn StackFrame>,
    document: Rc<SourceDocument>,
    call: NodeId,
}

impl FrameContext {
    pub fn new(
        frame: Rc<dyn StackFrame>,
        document: Rc<SourceDocument>,
        call: NodeId,
    ) -> FrameContext {
        FrameContext {
            frame,
            document,
            call,
        }
    }

    pub fn frame(&self) -> &dyn StackFrame {
        self.frame.as_ref()
    }

    pub fn document(&self) -> &Rc<SourceDocument> {
        &self.document
    }

    /// The call expression this context was resolved from.
    pub fn call(&self) -> CallRef<'_> {
        self.document.call(self.call)
    }

    /// The statement around the call, however many lines it spans.
    pub fn enclosing_statement(&self) -> Result<StatementRef<'_>, ResolveError> {
        self.document.statement_of(self.call)
    }

    /// Names the nearest binding construct assigns the call's result to.
    pub fn assigned_names(&self) -> Result<Rc<[String]>, ResolveError> {
        self.document.assigned_names(self.call)
    }
}

impl fmt::Debug for FrameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameContext")
            .field("path", &self.frame.path())
            .field("line", &self.frame.line())
            .finish()
    }
}
