//! Dispatchers: callables that recover their own call site.
//!
//! A [`Dispatcher`] is a named piece of logic that, when reached through
//! attribute access or a direct call, inspects the live stack and the parsed
//! source to find the exact call expression that invoked it. The logic then
//! runs with a [`FrameContext`] describing that call site.
//!
//! Two resolution paths exist. Attribute access (`namespace.name(...)`) is
//! resolved eagerly at access time by [`Dispatcher::access`]: if the executing
//! line holds exactly one matching attribute call the access binds, otherwise
//! the dispatcher value passes through untouched. A direct call through an
//! alias (`grab = namespace.name` then `grab(...)`) is resolved at call time
//! by [`Dispatcher::invoke`], which identity-matches call candidates on the
//! executing line against the dispatcher itself.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::frame::{CodeId, FrameContext, StackFrame, resolve_name};
use crate::runtime::error::RuntimeError;
use crate::runtime::value::Value;
use crate::source::ResolveError;
use crate::source::document::{DocumentCache, LoadError, SourceDocument};
use crate::source::map::NodeId;

/// State shared by every dispatcher: the parsed-document cache and the
/// registry of code objects resolution must skip.
#[derive(Default)]
pub struct Engine {
    documents: DocumentCache,
    excluded: RefCell<FxHashSet<CodeId>>,
}

impl Engine {
    pub fn new() -> Engine {
        Engine::default()
    }

    /// Cached parse of `path`; reads the file on first use only.
    pub fn document(&self, path: &Path) -> Result<Rc<SourceDocument>, LoadError> {
        self.documents.load(path)
    }

    /// Registers an in-memory document (stdin, tests) under its path. The
    /// first registration of a path wins.
    pub fn register_document(&self, document: SourceDocument) -> Rc<SourceDocument> {
        self.documents.insert(document)
    }

    pub fn cached_document(&self, path: &Path) -> Option<Rc<SourceDocument>> {
        self.documents.get(path)
    }

    /// Marks a code object as resolution machinery. Frames running it are
    /// skipped when a dispatcher walks the stack for its real caller.
    pub fn exclude(&self, code: CodeId) {
        self.excluded.borrow_mut().insert(code);
    }

    pub fn is_excluded(&self, code: CodeId) -> bool {
        self.excluded.borrow().contains(&code)
    }
}

/// Outcome of reaching a dispatcher through attribute access.
pub enum Access {
    /// No call on the executing line targets the dispatcher; the dispatcher
    /// value itself flows through, e.g. into an alias binding.
    PassThrough,
    /// The access is the callee of exactly one call on the executing line;
    /// the call site is captured for [`Dispatcher::run`].
    Bound(FrameContext),
}

pub type DispatchLogic = dyn Fn(&FrameContext, Vec<Value>) -> Result<Value, RuntimeError>;

/// A named call-site-aware callable.
pub struct Dispatcher {
    engine: Rc<Engine>,
    name: String,
    logic: Rc<DispatchLogic>,
}

impl Dispatcher {
    pub fn new<F>(engine: Rc<Engine>, name: impl Into<String>, logic: F) -> Dispatcher
    where
        F: Fn(&FrameContext, Vec<Value>) -> Result<Value, RuntimeError> + 'static,
    {
        Dispatcher {
            engine,
            name: name.into(),
            logic: Rc::new(logic),
        }
    }

    pub fn engine(&self) -> &Rc<Engine> {
        &self.engine
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves an attribute access against the innermost frame that is not
    /// excluded machinery.
    ///
    /// `frames` is the live stack, innermost last. The executing line of the
    /// chosen frame must hold at most one `object.name(...)` call whose
    /// attribute matches this dispatcher's name: exactly one binds, none
    /// passes through, several is an error.
    pub fn access(&self, frames: &[Rc<dyn StackFrame>]) -> Result<Access, RuntimeError> {
        let Some(frame) = frames
            .iter()
            .rev()
            .find(|frame| !self.engine.is_excluded(frame.code()))
        else {
            return Ok(Access::PassThrough);
        };
        let document = self.document_for(frame.as_ref())?;
        let found = document
            .attribute_call_at(frame.line(), &self.name)
            .map_err(|error| self.call_site_error(frame.as_ref(), error))?
            .map(|call| call.id());
        match found {
            Some(call) => Ok(Access::Bound(FrameContext::new(
                frame.clone(),
                document,
                call,
            ))),
            None => Ok(Access::PassThrough),
        }
    }

    /// Resolves a direct call (through an alias) against the calling frame.
    ///
    /// Every bare-name call in the statement on the executing line is a
    /// candidate; a candidate matches when its callee name resolves, in the
    /// frame's own scope, to this very value. A candidate name that resolves
    /// nowhere is an error, not a skipped candidate. Exactly one match runs
    /// the logic; none or several is an error.
    pub fn invoke(
        &self,
        frame: &Rc<dyn StackFrame>,
        myself: &Value,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let document = self.document_for(frame.as_ref())?;
        let line = frame.line();
        let matched: Vec<NodeId> = {
            let calls = document
                .named_calls_at(line)
                .map_err(|error| self.call_site_error(frame.as_ref(), error))?;
            let mut matched = Vec::new();
            for call in &calls {
                let Some(callee) = call.callee_name() else {
                    continue;
                };
                // An unresolvable candidate name is an error in its own
                // right, never silently dropped from the candidate set.
                let value = resolve_name(frame.as_ref(), callee)
                    .map_err(|error| self.call_site_error(frame.as_ref(), error))?;
                if value.is(myself) {
                    matched.push(call.id());
                }
            }
            matched
        };
        match matched.len() {
            1 => {
                let context = FrameContext::new(frame.clone(), document, matched[0]);
                self.run(&context, args)
            }
            0 => Err(self.call_site_error(
                frame.as_ref(),
                ResolveError::UnresolvedCall {
                    name: self.name.clone(),
                    line,
                },
            )),
            found => Err(self.call_site_error(
                frame.as_ref(),
                ResolveError::AmbiguousCall {
                    candidates: found,
                    name: self.name.clone(),
                    line,
                },
            )),
        }
    }

    /// Runs the dispatcher's logic against an already-resolved call site.
    pub fn run(&self, context: &FrameContext, args: Vec<Value>) -> Result<Value, RuntimeError> {
        (self.logic)(context, args)
    }

    fn document_for(&self, frame: &dyn StackFrame) -> Result<Rc<SourceDocument>, RuntimeError> {
        self.engine
            .document(frame.path())
            .map_err(|error| RuntimeError::Source { error })
    }

    fn call_site_error(&self, frame: &dyn StackFrame, error: ResolveError) -> RuntimeError {
        RuntimeError::CallSite {
            path: frame.path().to_path_buf(),
            line: frame.line(),
            error,
        }
    }
}
