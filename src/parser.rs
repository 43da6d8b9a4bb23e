use thiserror::Error;

use crate::ast::{
    AssignTarget, BinaryOperator, Comprehension, Expression, ExpressionKind, Program, Statement,
    StatementKind,
};
use crate::token::{Span, Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected}, got {found} at line {line}, column {column}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("Cannot assign to this expression at line {line}, column {column}")]
    InvalidAssignmentTarget { line: usize, column: usize },
}

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !matches!(self.current().kind, TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.current().kind {
            TokenKind::Def => self.parse_function_def(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Pass => {
                let span = self.current_span();
                self.advance();
                self.expect_newline()?;
                Ok(Statement {
                    kind: StatementKind::Pass,
                    span,
                })
            }
            _ => self.parse_assign_or_expression(),
        }
    }

    fn parse_function_def(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        self.advance(); // def
        let (name, _) = self.expect_identifier()?;
        self.expect_lparen()?;
        let mut params = Vec::new();
        if !matches!(self.current().kind, TokenKind::RParen) {
            loop {
                let (param, _) = self.expect_identifier()?;
                params.push(param);
                if matches!(self.current().kind, TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect_rparen()?;
        let body = self.parse_block()?;
        let end = body.last().map(|stmt| stmt.span).unwrap_or(start);

        Ok(Statement {
            kind: StatementKind::FunctionDef { name, params, body },
            span: start.to(end),
        })
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        self.advance(); // if
        let condition = self.parse_expression()?;
        let then_body = self.parse_block()?;
        let mut else_body = Vec::new();
        if matches!(self.current().kind, TokenKind::Else) {
            self.advance();
            else_body = self.parse_block()?;
        }
        let end = else_body
            .last()
            .or(then_body.last())
            .map(|stmt| stmt.span)
            .unwrap_or(start);

        Ok(Statement {
            kind: StatementKind::If {
                condition,
                then_body,
                else_body,
            },
            span: start.to(end),
        })
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        self.advance(); // while
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        let end = body.last().map(|stmt| stmt.span).unwrap_or(start);

        Ok(Statement {
            kind: StatementKind::While { condition, body },
            span: start.to(end),
        })
    }

    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        self.advance(); // for
        let target = self.parse_target_list()?;
        self.expect_in()?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        let end = body.last().map(|stmt| stmt.span).unwrap_or(start);

        Ok(Statement {
            kind: StatementKind::For {
                target,
                iterable,
                body,
            },
            span: start.to(end),
        })
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        self.advance(); // return
        if matches!(self.current().kind, TokenKind::Newline) {
            self.advance();
            return Ok(Statement {
                kind: StatementKind::Return(None),
                span: start,
            });
        }
        let value = self.parse_expression()?;
        let span = start.to(value.span);
        self.expect_newline()?;
        Ok(Statement {
            kind: StatementKind::Return(Some(value)),
            span,
        })
    }

    fn parse_assign_or_expression(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        let first = self.parse_expression()?;

        if matches!(self.current().kind, TokenKind::Comma | TokenKind::Equal) {
            let mut targets = vec![first];
            while matches!(self.current().kind, TokenKind::Comma) {
                self.advance();
                targets.push(self.parse_expression()?);
            }
            self.expect_equal()?;
            let value = self.parse_expression()?;
            let span = start.to(value.span);
            self.expect_newline()?;

            let target = if targets.len() == 1 {
                Self::expression_to_target(targets.pop().expect("single target present"))?
            } else {
                let elements = targets
                    .into_iter()
                    .map(Self::expression_to_target)
                    .collect::<Result<Vec<_>, _>>()?;
                AssignTarget::Tuple(elements)
            };

            return Ok(Statement {
                kind: StatementKind::Assign { target, value },
                span,
            });
        }

        let span = first.span;
        self.expect_newline()?;
        Ok(Statement {
            kind: StatementKind::Expr(first),
            span,
        })
    }

    /// Target of a `for` header: one or more comma-separated targets.
    fn parse_target_list(&mut self) -> Result<AssignTarget, ParseError> {
        let mut targets = vec![self.parse_expression()?];
        while matches!(self.current().kind, TokenKind::Comma) {
            self.advance();
            targets.push(self.parse_expression()?);
        }
        if targets.len() == 1 {
            Self::expression_to_target(targets.pop().expect("single target present"))
        } else {
            let elements = targets
                .into_iter()
                .map(Self::expression_to_target)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AssignTarget::Tuple(elements))
        }
    }

    fn expression_to_target(expr: Expression) -> Result<AssignTarget, ParseError> {
        match expr.kind {
            ExpressionKind::Identifier(name) => Ok(AssignTarget::Name(name)),
            ExpressionKind::Attribute { object, name } => Ok(AssignTarget::Attribute {
                object: *object,
                name,
            }),
            ExpressionKind::Index { object, index } => Ok(AssignTarget::Index {
                object: *object,
                index: *index,
            }),
            _ => Err(ParseError::InvalidAssignmentTarget {
                line: expr.span.line,
                column: expr.span.column,
            }),
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect_colon()?;
        self.expect_newline()?;
        self.expect_indent()?;

        let mut body = Vec::new();
        while !matches!(self.current().kind, TokenKind::Dedent | TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            body.push(self.parse_statement()?);
        }
        self.expect_dedent()?;
        Ok(body)
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_additive()?;
        if matches!(self.current().kind, TokenKind::Less) {
            self.advance();
            let right = self.parse_additive()?;
            let span = left.span.to(right.span);
            return Ok(Expression {
                kind: ExpressionKind::BinaryOp {
                    left: Box::new(left),
                    op: BinaryOperator::LessThan,
                    right: Box::new(right),
                },
                span,
            });
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_postfix()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_postfix()?;
            let span = expr.span.to(right.span);
            expr = Expression {
                kind: ExpressionKind::BinaryOp {
                    left: Box::new(expr),
                    op,
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current().kind {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.current().kind, TokenKind::RParen) {
                        args.push(self.parse_expression()?);
                        while matches!(self.current().kind, TokenKind::Comma) {
                            self.advance();
                            if matches!(self.current().kind, TokenKind::RParen) {
                                break;
                            }
                            args.push(self.parse_expression()?);
                        }
                    }
                    let close = self.expect_rparen()?;
                    let span = expr.span.to(close);
                    expr = Expression {
                        kind: ExpressionKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let (name, name_span) = self.expect_identifier()?;
                    let span = expr.span.to(name_span);
                    expr = Expression {
                        kind: ExpressionKind::Attribute {
                            object: Box::new(expr),
                            name,
                        },
                        span,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let close = self.expect_rbracket()?;
                    let span = expr.span.to(close);
                    expr = Expression {
                        kind: ExpressionKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let span = self.current_span();
        match self.current().kind {
            TokenKind::Integer(value) => {
                self.advance();
                Ok(Expression {
                    kind: ExpressionKind::Integer(value),
                    span,
                })
            }
            TokenKind::String(content) => {
                let content = content.to_string();
                self.advance();
                Ok(Expression {
                    kind: ExpressionKind::String(content),
                    span,
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression {
                    kind: ExpressionKind::Boolean(true),
                    span,
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression {
                    kind: ExpressionKind::Boolean(false),
                    span,
                })
            }
            TokenKind::NoneLiteral => {
                self.advance();
                Ok(Expression {
                    kind: ExpressionKind::NoneLiteral,
                    span,
                })
            }
            TokenKind::Identifier(name) => {
                let name = name.to_string();
                self.advance();
                Ok(Expression {
                    kind: ExpressionKind::Identifier(name),
                    span,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_list_or_comprehension(span),
            _ => Err(self.error("expression")),
        }
    }

    fn parse_list_or_comprehension(&mut self, start: Span) -> Result<Expression, ParseError> {
        self.advance(); // [
        if matches!(self.current().kind, TokenKind::RBracket) {
            let close = self.expect_rbracket()?;
            return Ok(Expression {
                kind: ExpressionKind::List(Vec::new()),
                span: start.to(close),
            });
        }

        let first = self.parse_expression()?;

        if matches!(self.current().kind, TokenKind::For) {
            let clause_start = self.current_span();
            self.advance(); // for
            let target = self.parse_target_list()?;
            self.expect_in()?;
            let iterable = self.parse_expression()?;
            let condition = if matches!(self.current().kind, TokenKind::If) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            let clause_end = condition
                .as_ref()
                .map(|cond| cond.span)
                .unwrap_or(iterable.span);
            let close = self.expect_rbracket()?;
            return Ok(Expression {
                kind: ExpressionKind::ListComp {
                    element: Box::new(first),
                    clause: Box::new(Comprehension {
                        target,
                        iterable,
                        condition,
                        span: clause_start.to(clause_end),
                    }),
                },
                span: start.to(close),
            });
        }

        let mut elements = vec![first];
        while matches!(self.current().kind, TokenKind::Comma) {
            self.advance();
            if matches!(self.current().kind, TokenKind::RBracket) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        let close = self.expect_rbracket()?;
        Ok(Expression {
            kind: ExpressionKind::List(elements),
            span: start.to(close),
        })
    }

    fn consume_newlines(&mut self) -> bool {
        let mut consumed = false;
        while matches!(self.current().kind, TokenKind::Newline) {
            consumed = true;
            self.advance();
        }
        consumed
    }

    fn expect_identifier(&mut self) -> Result<(String, Span), ParseError> {
        if let TokenKind::Identifier(name) = self.current().kind {
            let name = name.to_string();
            let span = self.current_span();
            self.advance();
            Ok((name, span))
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect_equal(&mut self) -> Result<Span, ParseError> {
        self.expect_kind(&TokenKind::Equal, "'='")
    }

    fn expect_in(&mut self) -> Result<Span, ParseError> {
        self.expect_kind(&TokenKind::In, "'in'")
    }

    fn expect_lparen(&mut self) -> Result<Span, ParseError> {
        self.expect_kind(&TokenKind::LParen, "'('")
    }

    fn expect_rparen(&mut self) -> Result<Span, ParseError> {
        self.expect_kind(&TokenKind::RParen, "')'")
    }

    fn expect_rbracket(&mut self) -> Result<Span, ParseError> {
        self.expect_kind(&TokenKind::RBracket, "']'")
    }

    fn expect_colon(&mut self) -> Result<Span, ParseError> {
        self.expect_kind(&TokenKind::Colon, "':'")
    }

    fn expect_newline(&mut self) -> Result<Span, ParseError> {
        self.expect_kind(&TokenKind::Newline, "newline")
    }

    fn expect_indent(&mut self) -> Result<Span, ParseError> {
        self.expect_kind(&TokenKind::Indent, "indent")
    }

    fn expect_dedent(&mut self) -> Result<Span, ParseError> {
        self.expect_kind(&TokenKind::Dedent, "dedent")
    }

    fn expect_kind(&mut self, kind: &TokenKind<'_>, expected: &str) -> Result<Span, ParseError> {
        if self.current().kind == *kind {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.error(expected))
        }
    }

    fn current(&self) -> &Token<'a> {
        &self.tokens[self.position]
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn advance(&mut self) {
        // The token stream always ends with EOF; never step past it.
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        let token = self.current();
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.describe(),
            line: token.span.line,
            column: token.span.column,
        }
    }
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use indoc::indoc;

    fn parse(input: &str) -> Result<Program, ParseError> {
        let tokens = tokenize(input).expect("tokenize should succeed");
        parse_tokens(tokens)
    }

    fn parse_ok(input: &str) -> Program {
        parse(input).expect("parse failed")
    }

    #[test]
    fn parses_function_def_with_params() {
        let input = indoc! {"
            def add(a, b):
                return a + b
        "};
        let program = parse_ok(input);
        assert_eq!(program.statements.len(), 1);
        let StatementKind::FunctionDef { name, params, body } = &program.statements[0].kind else {
            panic!("expected function def");
        };
        assert_eq!(name, "add");
        assert_eq!(params, &["a".to_string(), "b".to_string()]);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn parses_tuple_assignment() {
        let program = parse_ok("a, b = pair()\n");
        let StatementKind::Assign { target, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(
            target,
            &AssignTarget::Tuple(vec![
                AssignTarget::Name("a".to_string()),
                AssignTarget::Name("b".to_string()),
            ])
        );
    }

    #[test]
    fn parses_attribute_target() {
        let program = parse_ok("box.value = 1\n");
        let StatementKind::Assign { target, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        let AssignTarget::Attribute { object, name } = target else {
            panic!("expected attribute target");
        };
        assert!(matches!(&object.kind, ExpressionKind::Identifier(n) if n == "box"));
        assert_eq!(name, "value");
    }

    #[test]
    fn parses_index_target() {
        let program = parse_ok("xs[0] = 1\n");
        let StatementKind::Assign { target, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(target, AssignTarget::Index { .. }));
    }

    #[test]
    fn parses_attribute_call_chain() {
        let program = parse_ok("names = scry.assigned_names()\n");
        let StatementKind::Assign { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        let ExpressionKind::Call { callee, args } = &value.kind else {
            panic!("expected call");
        };
        assert!(args.is_empty());
        let ExpressionKind::Attribute { object, name } = &callee.kind else {
            panic!("expected attribute callee");
        };
        assert_eq!(name, "assigned_names");
        assert!(matches!(&object.kind, ExpressionKind::Identifier(n) if n == "scry"));
    }

    #[test]
    fn parses_for_loop_with_tuple_target() {
        let input = indoc! {"
            for k, v in pairs:
                print(k, v)
        "};
        let program = parse_ok(input);
        let StatementKind::For { target, body, .. } = &program.statements[0].kind else {
            panic!("expected for loop");
        };
        assert!(matches!(target, AssignTarget::Tuple(elements) if elements.len() == 2));
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn parses_list_comprehension() {
        let program = parse_ok("out = [x + 1 for x in xs if x < 3]\n");
        let StatementKind::Assign { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        let ExpressionKind::ListComp { clause, .. } = &value.kind else {
            panic!("expected comprehension");
        };
        assert_eq!(clause.target, AssignTarget::Name("x".to_string()));
        assert!(clause.condition.is_some());
    }

    #[test]
    fn parses_if_else() {
        let input = indoc! {"
            if x < 1:
                y = 1
            else:
                y = 2
        "};
        let program = parse_ok(input);
        let StatementKind::If {
            then_body,
            else_body,
            ..
        } = &program.statements[0].kind
        else {
            panic!("expected if statement");
        };
        assert_eq!(then_body.len(), 1);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn multiline_call_keeps_argument_lines() {
        let input = "full = note(\n    1,\n    2)\n";
        let program = parse_ok(input);
        let statement = &program.statements[0];
        assert_eq!(statement.span.line, 1);
        let StatementKind::Assign { value, .. } = &statement.kind else {
            panic!("expected assignment");
        };
        assert_eq!(value.span.line, 1);
        let ExpressionKind::Call { args, .. } = &value.kind else {
            panic!("expected call");
        };
        assert_eq!(args[0].span.line, 2);
        assert_eq!(args[1].span.line, 3);
    }

    #[test]
    fn errors_on_missing_colon() {
        let err = parse("if x\n    y = 1\n").expect_err("expected parse failure");
        assert!(err.to_string().contains("Expected ':'"));
    }

    #[test]
    fn errors_on_literal_assignment_target() {
        let err = parse("1 = 2\n").expect_err("expected parse failure");
        assert_eq!(
            err,
            ParseError::InvalidAssignmentTarget { line: 1, column: 0 }
        );
    }

    #[test]
    fn errors_on_bare_tuple_expression() {
        let err = parse("a, b\n").expect_err("expected parse failure");
        assert!(err.to_string().contains("Expected '='"));
    }
}
