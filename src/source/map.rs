//! Flattened, line-indexed view of a parsed program.
//!
//! Every statement, clause, and expression becomes one record with a span and
//! a parent link, so a (line, shape) query can find a node and then climb to
//! the statement or binding construct around it without re-walking the tree.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{AssignTarget, Expression, ExpressionKind, Program, Statement, StatementKind};
use crate::source::ResolveError;
use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Names a statement or clause introduces by assignment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BindingKind {
    /// The construct binds nothing.
    None,
    /// Flat name-per-target list, in source order.
    Targets(Rc<[String]>),
    /// The construct assigns, but not to a form a name can be read from.
    Unsupported,
}

/// Shape of a call's callee, precomputed so resolution never touches the AST.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CalleeShape {
    /// `name(...)`
    Named(String),
    /// `object.name(...)`
    Attribute(String),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodePayload {
    Statement(BindingKind),
    /// `for target in iterable` clause of a comprehension.
    Clause(BindingKind),
    Call(CalleeShape),
    Plain,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeRecord {
    pub span: Span,
    pub parent: Option<NodeId>,
    pub payload: NodePayload,
}

pub struct SyntaxMap {
    records: Vec<NodeRecord>,
    by_line: FxHashMap<usize, Vec<NodeId>>,
    enclosing: RefCell<FxHashMap<NodeId, NodeId>>,
    names: RefCell<FxHashMap<NodeId, Result<Rc<[String]>, ResolveError>>>,
}

impl SyntaxMap {
    pub(crate) fn build(program: &Program) -> SyntaxMap {
        let mut builder = MapBuilder {
            records: Vec::new(),
            by_line: FxHashMap::default(),
        };
        for statement in &program.statements {
            builder.add_statement(statement, None);
        }
        SyntaxMap {
            records: builder.records,
            by_line: builder.by_line,
            enclosing: RefCell::new(FxHashMap::default()),
            names: RefCell::new(FxHashMap::default()),
        }
    }

    pub(crate) fn record(&self, id: NodeId) -> &NodeRecord {
        &self.records[id.index()]
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.records.len()).map(|index| NodeId(index as u32))
    }

    pub(crate) fn line_nodes(&self, line: usize) -> &[NodeId] {
        self.by_line
            .get(&line)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.records.len()
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.record(id).span
    }

    /// Nearest statement at or above `node`. Memoized; maps are shared and
    /// queried repeatedly for the same hot lines.
    pub fn enclosing_statement(&self, node: NodeId) -> Result<NodeId, ResolveError> {
        if let Some(&found) = self.enclosing.borrow().get(&node) {
            return Ok(found);
        }
        let mut cursor = node;
        loop {
            if matches!(self.record(cursor).payload, NodePayload::Statement(_)) {
                self.enclosing.borrow_mut().insert(node, cursor);
                return Ok(cursor);
            }
            match self.record(cursor).parent {
                Some(parent) => cursor = parent,
                None => {
                    return Err(ResolveError::Structure {
                        message: "node has no statement ancestor",
                    });
                }
            }
        }
    }

    /// Names bound by the statement or comprehension clause nearest to
    /// `node`. The walk stops at the first binding construct; a non-binding
    /// statement there is an error, not a reason to climb further. Memoized,
    /// including the error outcomes: the answer never changes per node.
    pub fn assigned_names(&self, node: NodeId) -> Result<Rc<[String]>, ResolveError> {
        if let Some(derived) = self.names.borrow().get(&node) {
            return derived.clone();
        }
        let derived = self.derive_names(node);
        self.names.borrow_mut().insert(node, derived.clone());
        derived
    }

    fn derive_names(&self, node: NodeId) -> Result<Rc<[String]>, ResolveError> {
        let mut cursor = node;
        loop {
            match &self.record(cursor).payload {
                NodePayload::Statement(binding) | NodePayload::Clause(binding) => {
                    return match binding {
                        BindingKind::Targets(names) => Ok(names.clone()),
                        BindingKind::None => Err(ResolveError::NoAssignment),
                        BindingKind::Unsupported => Err(ResolveError::UnsupportedTarget),
                    };
                }
                NodePayload::Call(_) | NodePayload::Plain => {}
            }
            match self.record(cursor).parent {
                Some(parent) => cursor = parent,
                None => {
                    return Err(ResolveError::Structure {
                        message: "node has no statement ancestor",
                    });
                }
            }
        }
    }
}

struct MapBuilder {
    records: Vec<NodeRecord>,
    by_line: FxHashMap<usize, Vec<NodeId>>,
}

impl MapBuilder {
    fn push(&mut self, span: Span, parent: Option<NodeId>, payload: NodePayload) -> NodeId {
        let id = NodeId(self.records.len() as u32);
        self.records.push(NodeRecord {
            span,
            parent,
            payload,
        });
        self.by_line.entry(span.line).or_default().push(id);
        id
    }

    fn add_statement(&mut self, statement: &Statement, parent: Option<NodeId>) {
        let binding = match &statement.kind {
            StatementKind::Assign { target, .. } | StatementKind::For { target, .. } => {
                Self::binding_for(target)
            }
            _ => BindingKind::None,
        };
        let id = self.push(statement.span, parent, NodePayload::Statement(binding));

        match &statement.kind {
            StatementKind::FunctionDef { body, .. } => {
                for nested in body {
                    self.add_statement(nested, Some(id));
                }
            }
            StatementKind::Assign { target, value } => {
                self.add_target(target, id);
                self.add_expression(value, id);
            }
            StatementKind::While { condition, body } => {
                self.add_expression(condition, id);
                for nested in body {
                    self.add_statement(nested, Some(id));
                }
            }
            StatementKind::For {
                target,
                iterable,
                body,
            } => {
                self.add_target(target, id);
                self.add_expression(iterable, id);
                for nested in body {
                    self.add_statement(nested, Some(id));
                }
            }
            StatementKind::If {
                condition,
                then_body,
                else_body,
            } => {
                self.add_expression(condition, id);
                for nested in then_body.iter().chain(else_body) {
                    self.add_statement(nested, Some(id));
                }
            }
            StatementKind::Return(value) => {
                if let Some(value) = value {
                    self.add_expression(value, id);
                }
            }
            StatementKind::Pass => {}
            StatementKind::Expr(expr) => self.add_expression(expr, id),
        }
    }

    fn add_target(&mut self, target: &AssignTarget, parent: NodeId) {
        match target {
            AssignTarget::Name(_) => {}
            AssignTarget::Tuple(elements) => {
                for element in elements {
                    self.add_target(element, parent);
                }
            }
            AssignTarget::Index { object, index } => {
                self.add_expression(object, parent);
                self.add_expression(index, parent);
            }
            AssignTarget::Attribute { object, .. } => self.add_expression(object, parent),
        }
    }

    fn add_expression(&mut self, expr: &Expression, parent: NodeId) {
        let payload = match &expr.kind {
            ExpressionKind::Call { callee, .. } => NodePayload::Call(match &callee.kind {
                ExpressionKind::Identifier(name) => CalleeShape::Named(name.clone()),
                ExpressionKind::Attribute { name, .. } => CalleeShape::Attribute(name.clone()),
                _ => CalleeShape::Other,
            }),
            _ => NodePayload::Plain,
        };
        let id = self.push(expr.span, Some(parent), payload);

        match &expr.kind {
            ExpressionKind::Integer(_)
            | ExpressionKind::Identifier(_)
            | ExpressionKind::Boolean(_)
            | ExpressionKind::NoneLiteral
            | ExpressionKind::String(_) => {}
            ExpressionKind::List(elements) => {
                for element in elements {
                    self.add_expression(element, id);
                }
            }
            ExpressionKind::ListComp { element, clause } => {
                let clause_id = self.push(
                    clause.span,
                    Some(id),
                    NodePayload::Clause(Self::binding_for(&clause.target)),
                );
                self.add_target(&clause.target, clause_id);
                self.add_expression(&clause.iterable, clause_id);
                if let Some(condition) = &clause.condition {
                    self.add_expression(condition, clause_id);
                }
                // The element belongs to the comprehension, not its clause:
                // names bound by the clause apply only below the clause node.
                self.add_expression(element, id);
            }
            ExpressionKind::Index { object, index } => {
                self.add_expression(object, id);
                self.add_expression(index, id);
            }
            ExpressionKind::Attribute { object, .. } => self.add_expression(object, id),
            ExpressionKind::BinaryOp { left, right, .. } => {
                self.add_expression(left, id);
                self.add_expression(right, id);
            }
            ExpressionKind::Call { callee, args } => {
                self.add_expression(callee, id);
                for arg in args {
                    self.add_expression(arg, id);
                }
            }
        }
    }

    fn binding_for(target: &AssignTarget) -> BindingKind {
        match target {
            AssignTarget::Name(name) => BindingKind::Targets(vec![name.clone()].into()),
            AssignTarget::Attribute { name, .. } => BindingKind::Targets(vec![name.clone()].into()),
            AssignTarget::Index { .. } => BindingKind::Unsupported,
            AssignTarget::Tuple(elements) => {
                let mut names = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        AssignTarget::Name(name) => names.push(name.clone()),
                        AssignTarget::Attribute { name, .. } => names.push(name.clone()),
                        AssignTarget::Index { .. } | AssignTarget::Tuple(_) => {
                            return BindingKind::Unsupported;
                        }
                    }
                }
                BindingKind::Targets(names.into())
            }
        }
    }
}
