//! One parsed source file and the cache that shares such files.
//!
//! A document never changes after construction: the text, the tree, and the
//! node table all describe the file as it was first read. Node handles taken
//! from a document therefore stay valid for as long as the document lives,
//! and the [`DocumentCache`] guarantees one document per path.

use std::cell::{OnceCell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::ast::Program;
use crate::lexer::{self, LexError};
use crate::parser::{self, ParseError};
use crate::source::ResolveError;
use crate::source::callsite::CallSiteCache;
use crate::source::map::{CalleeShape, NodeId, NodePayload, SyntaxMap};
use crate::token::{Span, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Cannot read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("Cannot tokenize {}: {error}", path.display())]
    Lex { path: PathBuf, error: LexError },
    #[error("Cannot parse {}: {error}", path.display())]
    Parse { path: PathBuf, error: ParseError },
}

pub struct SourceDocument {
    path: PathBuf,
    text: String,
    program: Program,
    map: SyntaxMap,
    sites: CallSiteCache,
    tokens: OnceCell<Vec<TokenRecord>>,
}

impl SourceDocument {
    pub fn load(path: &Path) -> Result<SourceDocument, LoadError> {
        let text = fs::read_to_string(path).map_err(|error| LoadError::Read {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        Self::from_source(path.to_path_buf(), text)
    }

    /// Builds a document from in-memory source, e.g. stdin or a test case.
    /// A missing final newline is supplied so the last statement terminates.
    pub fn from_source(
        path: impl Into<PathBuf>,
        source: impl Into<String>,
    ) -> Result<SourceDocument, LoadError> {
        let path = path.into();
        let mut text = source.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        let tokens = lexer::tokenize(&text).map_err(|error| LoadError::Lex {
            path: path.clone(),
            error,
        })?;
        let program = parser::parse_tokens(tokens).map_err(|error| LoadError::Parse {
            path: path.clone(),
            error,
        })?;
        let map = SyntaxMap::build(&program);
        Ok(SourceDocument {
            path,
            text,
            program,
            map,
            sites: CallSiteCache::default(),
            tokens: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn map(&self) -> &SyntaxMap {
        &self.map
    }

    /// The unique `object.name(...)` call on `line`, if one exists.
    pub fn attribute_call_at(
        &self,
        line: usize,
        name: &str,
    ) -> Result<Option<CallRef<'_>>, ResolveError> {
        let found = self.sites.attribute_call_at(&self.map, line, name)?;
        Ok(found.map(|id| CallRef { document: self, id }))
    }

    /// Calls with bare-identifier callees in the statement covering `line`.
    pub fn named_calls_at(&self, line: usize) -> Result<Vec<CallRef<'_>>, ResolveError> {
        let calls = self.sites.named_calls_at(&self.map, line)?;
        Ok(calls
            .iter()
            .map(|&id| CallRef { document: self, id })
            .collect())
    }

    pub fn call(&self, id: NodeId) -> CallRef<'_> {
        CallRef { document: self, id }
    }

    pub fn statement_of(&self, id: NodeId) -> Result<StatementRef<'_>, ResolveError> {
        let statement = self.map.enclosing_statement(id)?;
        Ok(StatementRef {
            document: self,
            id: statement,
        })
    }

    pub fn assigned_names(&self, id: NodeId) -> Result<Rc<[String]>, ResolveError> {
        self.map.assigned_names(id)
    }

    /// Lazily re-tokenized stream backing text rendering. Only built when a
    /// caller first asks for statement or call text.
    fn token_records(&self) -> &[TokenRecord] {
        self.tokens.get_or_init(|| {
            lexer::tokenize(&self.text)
                .expect("document text was already tokenized at load")
                .iter()
                .filter(|token| !token.kind.is_structural())
                .map(|token| TokenRecord {
                    span: token.span,
                    class: TokenClass::of(&token.kind),
                })
                .collect()
        })
    }

    /// Renders the tokens inside `span` as a single line, with canonical
    /// spacing regardless of the original layout.
    fn normalized_text(&self, span: Span) -> String {
        let mut out = String::new();
        let mut previous: Option<TokenClass> = None;
        for record in self.token_records() {
            if record.span.start < span.start || record.span.end > span.end {
                continue;
            }
            if let Some(previous) = previous
                && wants_gap(previous, record.class)
            {
                out.push(' ');
            }
            out.push_str(&self.text[record.span.start..record.span.end]);
            previous = Some(record.class);
        }
        out
    }
}

/// Handle to a call node inside a document.
#[derive(Clone, Copy)]
pub struct CallRef<'a> {
    document: &'a SourceDocument,
    id: NodeId,
}

impl<'a> CallRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn line(&self) -> usize {
        self.span().line
    }

    pub fn span(&self) -> Span {
        self.document.map.span(self.id)
    }

    /// The call rendered as one line of canonical source text.
    pub fn text(&self) -> String {
        self.document.normalized_text(self.span())
    }

    /// Callee name when the callee is a bare identifier.
    pub fn callee_name(&self) -> Option<&'a str> {
        match &self.document.map.record(self.id).payload {
            NodePayload::Call(CalleeShape::Named(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Attribute name when the callee is an `object.name` access.
    pub fn callee_attribute(&self) -> Option<&'a str> {
        match &self.document.map.record(self.id).payload {
            NodePayload::Call(CalleeShape::Attribute(name)) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// Handle to a statement node inside a document.
#[derive(Clone, Copy)]
pub struct StatementRef<'a> {
    document: &'a SourceDocument,
    id: NodeId,
}

impl StatementRef<'_> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn line(&self) -> usize {
        self.span().line
    }

    pub fn span(&self) -> Span {
        self.document.map.span(self.id)
    }

    /// The statement rendered as one line of canonical source text.
    pub fn text(&self) -> String {
        self.document.normalized_text(self.span())
    }

    /// The exact source slice, including original layout.
    pub fn raw_text(&self) -> &str {
        let span = self.span();
        &self.document.text[span.start..span.end]
    }
}

#[derive(Debug, Clone, Copy)]
struct TokenRecord {
    span: Span,
    class: TokenClass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenClass {
    /// Identifiers and literals: may head a call or subscript.
    Atom,
    Keyword,
    Operator,
    Open,
    /// Closing bracket: may also head a further call or subscript.
    Close,
    Comma,
    Colon,
    Dot,
}

impl TokenClass {
    fn of(kind: &TokenKind<'_>) -> TokenClass {
        match kind {
            TokenKind::Identifier(_)
            | TokenKind::Integer(_)
            | TokenKind::String(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::NoneLiteral => TokenClass::Atom,
            TokenKind::If
            | TokenKind::Else
            | TokenKind::While
            | TokenKind::For
            | TokenKind::In
            | TokenKind::Def
            | TokenKind::Return
            | TokenKind::Pass => TokenClass::Keyword,
            TokenKind::Equal | TokenKind::Plus | TokenKind::Minus | TokenKind::Less => {
                TokenClass::Operator
            }
            TokenKind::LParen | TokenKind::LBracket => TokenClass::Open,
            TokenKind::RParen | TokenKind::RBracket => TokenClass::Close,
            TokenKind::Comma => TokenClass::Comma,
            TokenKind::Colon => TokenClass::Colon,
            TokenKind::Dot => TokenClass::Dot,
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent | TokenKind::EOF => {
                // Structural tokens are filtered before classification.
                TokenClass::Keyword
            }
        }
    }
}

fn wants_gap(previous: TokenClass, current: TokenClass) -> bool {
    match (previous, current) {
        (_, TokenClass::Close) | (_, TokenClass::Comma) | (_, TokenClass::Colon) => false,
        (TokenClass::Open, _) => false,
        (TokenClass::Dot, _) | (_, TokenClass::Dot) => false,
        // Call and subscript brackets attach to what they follow.
        (TokenClass::Atom, TokenClass::Open) | (TokenClass::Close, TokenClass::Open) => false,
        _ => true,
    }
}

/// Shared, path-keyed store of parsed documents.
///
/// The first parse of a path wins; later loads and registrations return the
/// original document even if the file on disk has changed since.
#[derive(Default)]
pub struct DocumentCache {
    documents: RefCell<FxHashMap<PathBuf, Rc<SourceDocument>>>,
}

impl DocumentCache {
    pub fn new() -> DocumentCache {
        DocumentCache::default()
    }

    /// Cached parse of `path`; reads the file on first use only.
    pub fn load(&self, path: &Path) -> Result<Rc<SourceDocument>, LoadError> {
        if let Some(document) = self.documents.borrow().get(path) {
            return Ok(document.clone());
        }
        let document = Rc::new(SourceDocument::load(path)?);
        self.documents
            .borrow_mut()
            .insert(path.to_path_buf(), document.clone());
        Ok(document)
    }

    pub fn get(&self, path: &Path) -> Option<Rc<SourceDocument>> {
        self.documents.borrow().get(path).cloned()
    }

    /// Registers an in-memory document under its path.
    pub fn insert(&self, document: SourceDocument) -> Rc<SourceDocument> {
        let path = document.path().to_path_buf();
        self.documents
            .borrow_mut()
            .entry(path)
            .or_insert_with(|| Rc::new(document))
            .clone()
    }
}
