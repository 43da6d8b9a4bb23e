//! Syntax tree shared by the interpreter and the call-site machinery.
//!
//! The parser builds these nodes once. The interpreter walks them directly,
//! while the source map flattens them into a line-indexed record table.

use crate::token::Span;

#[derive(Debug, PartialEq, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ExpressionKind {
    Integer(i64),
    Identifier(String),
    Boolean(bool),
    NoneLiteral,
    String(String),
    List(Vec<Expression>),
    ListComp {
        element: Box<Expression>,
        clause: Box<Comprehension>,
    },
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    Attribute {
        object: Box<Expression>,
        name: String,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
}

/// The `for target in iterable [if condition]` clause of a list comprehension.
#[derive(Debug, PartialEq, Clone)]
pub struct Comprehension {
    pub target: AssignTarget,
    pub iterable: Expression,
    pub condition: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Sub,
    LessThan,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub enum StatementKind {
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Statement>,
    },
    Assign {
        target: AssignTarget,
        value: Expression,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    For {
        target: AssignTarget,
        iterable: Expression,
        body: Vec<Statement>,
    },
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    Return(Option<Expression>),
    Pass,
    Expr(Expression),
}

/// Assignment target forms accepted by the parser.
///
/// `Tuple` is a single flat level: the grammar has no parenthesized target
/// groups, so nesting cannot occur.
#[derive(Debug, PartialEq, Clone)]
pub enum AssignTarget {
    Name(String),
    Tuple(Vec<AssignTarget>),
    Index {
        object: Expression,
        index: Expression,
    },
    Attribute {
        object: Expression,
        name: String,
    },
}

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub statements: Vec<Statement>,
}
